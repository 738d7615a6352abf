//! Decides which fetched bookings belong to tracked friends.
//!
//! Comparison is equality after trimming and lowercasing, never substring:
//! "s1234567" must be the whole field value, not buried inside one.
use crate::config::FriendSet;
use crate::model::{MatchedBooking, RawBooking};

/// Scans each booking's fields in the configured order; the first
/// field/identifier pair that matches wins and ends the scan for that booking.
/// Bookings matching nothing are dropped.
pub fn match_bookings(bookings: &[RawBooking], friends: &FriendSet) -> Vec<MatchedBooking> {
    bookings
        .iter()
        .filter_map(|b| match_one(b, friends))
        .collect()
}

fn match_one(booking: &RawBooking, friends: &FriendSet) -> Option<MatchedBooking> {
    for field in &friends.fields {
        let Some(value) = booking.fields.get(field) else {
            continue; // unknown/missing fields are absent, not errors
        };
        let needle = value.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(id) = friends.ids.iter().find(|id| **id == needle) {
            return Some(MatchedBooking {
                booking: booking.clone(),
                matched_id: id.clone(),
                matched_field: field.clone(),
            });
        }
    }
    None
}

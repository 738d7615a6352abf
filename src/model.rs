use crate::error::FailureKind;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bookable room as configured in rooms.json. The `id` is the opaque key the
/// API is queried with; `code` follows the campus `ddd.dd.dd` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// Checks the `ddd.dd.dd` room-code pattern, e.g. "080.10.04".
pub fn is_valid_room_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != 9 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        3 | 6 => *b == b'.',
        _ => b.is_ascii_digit(),
    })
}

/// One raw booking record as returned by the API, normalised at ingestion:
/// instants parsed to UTC, identifying text fields flattened into a name->value
/// map. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBooking {
    pub room_id: String,
    /// Validated room code from config, if the room has one.
    pub room_code: Option<String>,
    pub room_name: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Top-level string fields of the record (Owner, BookerEmailAddress, ...).
    pub fields: BTreeMap<String, String>,
}

/// A booking that matched one friend identifier. First match wins: the
/// configured field-scan order is the tie-break when several could apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedBooking {
    pub booking: RawBooking,
    pub matched_id: String,
    pub matched_field: String,
}

/// One block on the Mon-Fri 08:00-20:00 grid. The label is time-only; the
/// matched identifier never appears on an event (only on warnings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Mon=0 .. Fri=4.
    pub weekday: u8,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub label: String,
    pub room_code: Option<String>,
    pub room_name: String,
    /// Horizontal slot within the day column; overlapping events get distinct lanes.
    pub lane: usize,
    pub ignored: bool,
}

/// Emitted once per event whose room sits on the ignore list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub room_code: String,
    pub room_name: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub matched_id: String,
}

impl Warning {
    pub fn message(&self) -> String {
        format!(
            "IGNORE-ROOM: {} booked {} ({}) {} {}–{}",
            self.matched_id,
            self.room_code,
            self.room_name,
            self.date.format("%a %d %b"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
        )
    }
}

/// A room whose fetch failed, kept alongside partial results so the caller can
/// report which rooms are missing and whether re-authentication would help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRoom {
    pub room_id: String,
    pub kind: FailureKind,
    pub message: String,
}

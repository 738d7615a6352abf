//! Projects matched bookings onto the Mon-Fri, 08:00-20:00 local-time grid and
//! resolves overlaps into side-by-side lanes.
use crate::model::{CalendarEvent, MatchedBooking};
use crate::timewindow::{DISPLAY_TZ, WeekWindow};
use chrono::{Datelike, Duration, NaiveTime, Timelike};

/// Display window bounds, in seconds from local midnight. The upper bound is
/// exclusive: `[08:00, 20:00)`.
const DAY_START_SECS: i64 = 8 * 3600;
const DAY_END_SECS: i64 = 20 * 3600;

/// A laid-out event plus the identifier that matched its booking. The
/// identifier stays internal so events can be handed downstream without it;
/// the ignore policy moves it onto warnings where it is allowed to appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedEvent {
    pub event: CalendarEvent,
    pub matched_id: String,
}

/// Converts bookings to local-time grid events, clipped to the display window,
/// split per day when they span midnight, with deterministic lane assignment.
/// Output is ordered by (weekday, start, lane).
pub fn layout(matches: &[MatchedBooking], window: &WeekWindow) -> Vec<PlacedEvent> {
    let mut placed: Vec<PlacedEvent> = Vec::new();
    for m in matches {
        day_segments(m, window, &mut placed);
    }

    // Lane assignment is per weekday over start-sorted candidates.
    placed.sort_by(|a, b| {
        (a.event.weekday, a.event.start, a.event.end).cmp(&(
            b.event.weekday,
            b.event.start,
            b.event.end,
        ))
    });
    let mut i = 0;
    while i < placed.len() {
        let day = placed[i].event.weekday;
        let mut j = i;
        while j < placed.len() && placed[j].event.weekday == day {
            j += 1;
        }
        assign_lanes(&mut placed[i..j]);
        i = j;
    }

    placed.sort_by(|a, b| {
        (a.event.weekday, a.event.start, a.event.lane).cmp(&(
            b.event.weekday,
            b.event.start,
            b.event.lane,
        ))
    });
    placed
}

/// Emits the in-window portion of one booking, one event per display day. A
/// booking that crosses local midnight contributes a clipped segment to each
/// in-range day; clipping never merges across the day boundary.
fn day_segments(m: &MatchedBooking, window: &WeekWindow, out: &mut Vec<PlacedEvent>) {
    let start_local = m.booking.start.with_timezone(&DISPLAY_TZ);
    let end_local = m.booking.end.with_timezone(&DISPLAY_TZ);
    if end_local <= start_local {
        return;
    }

    let start_date = start_local.date_naive();
    let end_date = end_local.date_naive();

    let mut date = start_date;
    while date <= end_date {
        if date < window.monday || date > window.friday {
            date += Duration::days(1);
            continue;
        }
        let weekday = date.weekday().num_days_from_monday() as u8;
        if weekday >= 5 {
            date += Duration::days(1);
            continue;
        }

        // Portion of the booking falling on this local day, then clipped to
        // the display window. All in seconds from local midnight.
        let raw_start = if date == start_date {
            secs_of(start_local.time())
        } else {
            0
        };
        let raw_end = if date == end_date {
            secs_of(end_local.time())
        } else {
            24 * 3600
        };
        let clip_start = raw_start.max(DAY_START_SECS);
        let clip_end = raw_end.min(DAY_END_SECS);
        if clip_end <= clip_start {
            date += Duration::days(1);
            continue;
        }

        let start = time_of(clip_start);
        let end = time_of(clip_end);
        out.push(PlacedEvent {
            event: CalendarEvent {
                weekday,
                date,
                start,
                end,
                label: format!("{}–{}", start.format("%H:%M"), end.format("%H:%M")),
                room_code: m.booking.room_code.clone(),
                room_name: m.booking.room_name.clone(),
                lane: 0,
                ignored: false,
            },
            matched_id: m.matched_id.clone(),
        });
        date += Duration::days(1);
    }
}

/// Greedy interval colouring over events pre-sorted by (start, end): reuse the
/// lowest lane whose previous occupant ended at or before this start, else open
/// a new lane. Intervals are half-open, so end == start does not overlap.
fn assign_lanes(day_events: &mut [PlacedEvent]) {
    let mut lane_ends: Vec<NaiveTime> = Vec::new();
    for placed in day_events.iter_mut() {
        let mut assigned = None;
        for (lane, lane_end) in lane_ends.iter_mut().enumerate() {
            if *lane_end <= placed.event.start {
                *lane_end = placed.event.end;
                assigned = Some(lane);
                break;
            }
        }
        placed.event.lane = match assigned {
            Some(lane) => lane,
            None => {
                lane_ends.push(placed.event.end);
                lane_ends.len() - 1
            }
        };
    }
}

fn secs_of(t: NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight())
}

fn time_of(secs: i64) -> NaiveTime {
    // Callers only pass values inside [DAY_START_SECS, DAY_END_SECS].
    NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, 0)
        .unwrap_or(NaiveTime::MIN)
}

//! Ignore-room policy: flags events in designated rooms and surfaces them as
//! warnings carrying the matched identifier.
use crate::config::IgnoreSet;
use crate::layout::PlacedEvent;
use crate::model::{CalendarEvent, Warning, is_valid_room_code};

/// Sets `ignored` on every event whose room code is in the ignore set and
/// emits one warning per such event. A code failing the `ddd.dd.dd` pattern is
/// never ignorable. This is also where the matched identifier is stripped from
/// the event stream: it survives only on warnings.
pub fn apply(placed: Vec<PlacedEvent>, ignore: &IgnoreSet) -> (Vec<CalendarEvent>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let events = placed
        .into_iter()
        .map(|mut p| {
            let hit = p
                .event
                .room_code
                .as_deref()
                .is_some_and(|code| is_valid_room_code(code) && ignore.contains(code));
            if hit {
                p.event.ignored = true;
                warnings.push(Warning {
                    room_code: p.event.room_code.clone().unwrap_or_default(),
                    room_name: p.event.room_name.clone(),
                    date: p.event.date,
                    start: p.event.start,
                    end: p.event.end,
                    matched_id: p.matched_id,
                });
            }
            p.event
        })
        .collect();
    (events, warnings)
}

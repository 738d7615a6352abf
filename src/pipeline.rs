//! Ties the stages together for one invocation:
//! resolve window -> fetch all rooms -> match -> layout -> ignore policy.
//!
//! Partial results always beat no results: per-room failures flow through the
//! remaining stages; only "every room failed" short-circuits.
use crate::client::{BookingClient, FetchOptions};
use crate::config::{FriendSet, IgnoreSet};
use crate::error::FetchError;
use crate::model::{CalendarEvent, FailedRoom, MatchedBooking, Room, Warning};
use crate::timewindow::WeekWindow;
use crate::{layout, matcher, policy};
use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    /// Every room fetched; events and warnings are complete for the week.
    Done,
    /// Some rooms failed; events cover the rooms that answered.
    PartialFailure,
    /// Every room failed. No events, no warnings; see failed_rooms for why.
    Failed,
}

/// The sole contract the rendering/upload/command layer depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekReport {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub title: String,
    pub status: PipelineStatus,
    pub events: Vec<CalendarEvent>,
    pub warnings: Vec<Warning>,
    pub failed_rooms: Vec<FailedRoom>,
    /// Bookings returned by the API before friend matching.
    pub total_fetched: usize,
    pub matched: usize,
    /// Records dropped at ingestion for missing/unparseable instants.
    pub malformed_dropped: usize,
}

/// Runs the full weekly pipeline. `now` is injected so the window resolution
/// stays a pure function of the clock. Fatal errors are limited to an empty
/// room list; anything per-room lands in `failed_rooms` instead.
pub async fn run_week(
    client: &BookingClient,
    rooms: &[Room],
    friends: &FriendSet,
    ignore: &IgnoreSet,
    now: DateTime<Utc>,
    opts: &FetchOptions,
) -> Result<WeekReport> {
    if rooms.is_empty() {
        bail!("No rooms configured; add room ids and codes to rooms.json first");
    }

    let window = WeekWindow::resolve(now);
    log::info!(
        "Fetching {} room(s) for {} ({} – {})",
        rooms.len(),
        window.title(),
        window.start_utc,
        window.end_utc
    );

    let outcome = client.fetch_all_rooms(rooms, &window, opts).await;

    if outcome.failed.len() == rooms.len() {
        log::error!("All {} room fetches failed", rooms.len());
        return Ok(WeekReport {
            week_start: window.monday,
            week_end: window.friday,
            title: window.title(),
            status: PipelineStatus::Failed,
            events: Vec::new(),
            warnings: Vec::new(),
            failed_rooms: outcome.failed,
            total_fetched: 0,
            matched: 0,
            malformed_dropped: outcome.malformed,
        });
    }

    let total_fetched = outcome.bookings.len();
    let matches = matcher::match_bookings(&outcome.bookings, friends);
    let matched = matches.len();
    let placed = layout::layout(&matches, &window);
    let (events, warnings) = policy::apply(placed, ignore);

    let status = if outcome.failed.is_empty() {
        PipelineStatus::Done
    } else {
        PipelineStatus::PartialFailure
    };

    Ok(WeekReport {
        week_start: window.monday,
        week_end: window.friday,
        title: window.title(),
        status,
        events,
        warnings,
        failed_rooms: outcome.failed,
        total_fetched,
        matched,
        malformed_dropped: outcome.malformed,
    })
}

/// Ad-hoc inspection path used by the CLI: fetch one room for an explicit UTC
/// window and run matching only, no calendar layout.
pub async fn run_adhoc(
    client: &BookingClient,
    room_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    friends: &FriendSet,
    opts: &FetchOptions,
) -> Result<(Vec<MatchedBooking>, usize), FetchError> {
    let room = Room {
        id: room_id.to_string(),
        code: String::new(),
        name: "?".to_string(),
    };
    let (bookings, _malformed) = client
        .fetch_bookings(&room, start, end, &opts.retry)
        .await?;
    let total = bookings.len();
    Ok((matcher::match_bookings(&bookings, friends), total))
}

// File: src/client/core.rs
//! HTTP client for the hidden BookingRequests API.
//!
//! One GET per room per window. The bearer token is attached per request and
//! never logged. Per-room failures are classified (authorization vs transient)
//! and reported upward; they never abort the other rooms.
use crate::config::Config;
use crate::error::FetchError;
use crate::model::{FailedRoom, RawBooking, Room, is_valid_room_code};
use crate::timewindow::WeekWindow;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("roomweek/", env!("CARGO_PKG_VERSION"));

/// How much of an error body is kept for diagnostics.
const PREVIEW_LEN: usize = 500;

/// Datetime keys tried in order; the API has shipped all three spellings.
const START_KEYS: [&str; 3] = ["StartDateTime", "startDate", "StartDate"];
const END_KEYS: [&str; 3] = ["EndDateTime", "endDate", "EndDate"];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub worker_limit: usize,
    pub room_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            worker_limit: 4,
            room_timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_limit: config.worker_limit.max(1),
            room_timeout: config.room_timeout(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_ms: config.retry_backoff_ms,
            },
        }
    }
}

/// Everything the fetch phase produced: partial results plus the rooms that
/// failed and how, plus the count of records dropped as malformed.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub bookings: Vec<RawBooking>,
    pub failed: Vec<FailedRoom>,
    pub malformed: usize,
}

#[derive(Clone)]
pub struct BookingClient {
    http: reqwest::Client,
    base: String,
    token: String,
    request_timeout_secs: u64,
}

// The token must never surface in logs or panic messages.
impl std::fmt::Debug for BookingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingClient")
            .field("base", &self.base)
            .field("token", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl BookingClient {
    pub fn new(base: &str, token: &str, request_timeout: Duration) -> Result<Self, FetchError> {
        if token.is_empty() {
            return Err(FetchError::EmptyCredential);
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            request_timeout_secs: request_timeout.as_secs(),
        })
    }

    fn booking_url(&self, room_id: &str, start_iso: &str, end_iso: &str) -> String {
        format!(
            "{}/api/Resources/{}/BookingRequests?StartDate={}&EndDate={}&CheckSplitPermissions=true",
            self.base, room_id, start_iso, end_iso
        )
    }

    /// One fetch for one room, with bounded retries on transient failures.
    /// Returns the parsed bookings plus the count of malformed records dropped.
    pub async fn fetch_bookings(
        &self,
        room: &Room,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        retry: &RetryPolicy,
    ) -> Result<(Vec<RawBooking>, usize), FetchError> {
        if start >= end {
            return Err(FetchError::InvalidWindow { start, end });
        }
        if room.id.trim().is_empty() {
            return Err(FetchError::EmptyRoomId);
        }

        let mut attempt = 0u32;
        loop {
            match self.fetch_once(room, start, end).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) if e.is_retriable() && attempt < retry.max_retries => {
                    attempt += 1;
                    let base = retry.backoff_ms.saturating_mul(u64::from(attempt));
                    let delay = base + fastrand::u64(0..=retry.backoff_ms.max(1) / 2);
                    log::warn!(
                        "Fetch for room {} failed ({}); retry {}/{} in {}ms",
                        room.id,
                        e,
                        attempt,
                        retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(
        &self,
        room: &Room,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(Vec<RawBooking>, usize), FetchError> {
        let fmt = "%Y-%m-%dT%H:%M:%S%.3fZ";
        let url = self.booking_url(
            &room.id,
            &start.format(fmt).to_string(),
            &end.format(fmt).to_string(),
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        secs: self.request_timeout_secs,
                    }
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(FetchError::Unauthorized { status });
        }
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            let preview = body.chars().take(PREVIEW_LEN).collect();
            return Err(FetchError::Status { status, preview });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        // Some endpoints return { items: [...] }, others a bare array.
        let records = match payload {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            other => {
                return Err(FetchError::Body(format!(
                    "expected array or object, got {}",
                    other
                )));
            }
        };

        let total = records.len();
        let bookings: Vec<RawBooking> = records
            .into_iter()
            .filter_map(|r| parse_booking(room, &r))
            .collect();
        let malformed = total - bookings.len();
        if malformed > 0 {
            log::info!(
                "Dropped {} malformed record(s) for room {}",
                malformed,
                room.id
            );
        }
        Ok((bookings, malformed))
    }

    /// Fetches every room concurrently (bounded) for the resolved week.
    /// Completion order is arbitrary; every result stays attributed to its room.
    /// A timed-out room counts as a per-room transient failure.
    pub async fn fetch_all_rooms(
        &self,
        rooms: &[Room],
        window: &WeekWindow,
        opts: &FetchOptions,
    ) -> FetchOutcome {
        let (start, end) = (window.start_utc, window.end_utc);
        let futures = rooms.iter().cloned().map(|room| {
            let client = self.clone();
            let retry = opts.retry.clone();
            let budget = opts.room_timeout;
            async move {
                let result =
                    match tokio::time::timeout(budget, client.fetch_bookings(&room, start, end, &retry))
                        .await
                    {
                        Ok(res) => res,
                        Err(_) => Err(FetchError::Timeout {
                            secs: budget.as_secs(),
                        }),
                    };
                (room, result)
            }
        });

        let mut stream = stream::iter(futures).buffer_unordered(opts.worker_limit.max(1));
        let mut outcome = FetchOutcome::default();
        while let Some((room, result)) = stream.next().await {
            match result {
                Ok((bookings, malformed)) => {
                    outcome.malformed += malformed;
                    outcome.bookings.extend(bookings);
                }
                Err(e) => {
                    log::warn!("Room {} ({}) failed: {}", room.code, room.id, e);
                    outcome.failed.push(FailedRoom {
                        room_id: room.id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}

/// Normalises one raw API record. Records with no parseable start/end are
/// malformed: the caller counts and drops them, processing continues.
fn parse_booking(room: &Room, record: &Value) -> Option<RawBooking> {
    let start = parse_instant(record, &START_KEYS)?;
    let end = parse_instant(record, &END_KEYS)?;

    let obj = record.as_object()?;
    let mut fields = BTreeMap::new();
    for (key, value) in obj {
        if let Some(text) = value.as_str() {
            fields.insert(key.clone(), text.to_string());
        }
    }

    let title = fields
        .get("Name")
        .or_else(|| fields.get("Title"))
        .cloned()
        .unwrap_or_else(|| "Booking".to_string());

    Some(RawBooking {
        room_id: room.id.clone(),
        room_code: if is_valid_room_code(&room.code) {
            Some(room.code.clone())
        } else {
            None
        },
        room_name: extract_room_name(record).unwrap_or_else(|| room.name.clone()),
        title,
        start,
        end,
        fields,
    })
}

/// First present, parseable ISO datetime among the candidate keys.
fn parse_instant(record: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    for key in keys {
        if let Some(text) = record.get(key).and_then(Value::as_str)
            && let Ok(dt) = DateTime::parse_from_rfc3339(text)
        {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Bookings have stored the room name in a few places over time.
fn extract_room_name(record: &Value) -> Option<String> {
    if let Some(name) = record
        .get("Resources")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .and_then(|r| r.get("Name").or_else(|| r.get("name")))
        .and_then(Value::as_str)
    {
        return Some(name.to_string());
    }
    record
        .get("ResourceName")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    fn room() -> Room {
        Room {
            id: "room-1".to_string(),
            code: "010.05.68".to_string(),
            name: "Swanston Group Study Room".to_string(),
        }
    }

    #[test]
    fn parses_record_with_mixed_fields() {
        let record = serde_json::json!({
            "StartDateTime": "2025-08-11T00:00:00.000Z",
            "EndDateTime": "2025-08-11T01:00:00.000Z",
            "Owner": "S1234567",
            "BookerEmailAddress": "friend@example.com",
            "Capacity": 8,
            "Resources": [{"Name": "Room From Record"}]
        });
        let booking = parse_booking(&room(), &record).unwrap();
        assert_eq!(booking.fields.get("Owner").unwrap(), "S1234567");
        assert!(!booking.fields.contains_key("Capacity")); // non-string dropped
        assert_eq!(booking.room_name, "Room From Record");
        assert_eq!(booking.room_code.as_deref(), Some("010.05.68"));
        assert_eq!(booking.title, "Booking");
    }

    #[test]
    fn record_without_instants_is_malformed() {
        let record = serde_json::json!({"Owner": "S1234567"});
        assert!(parse_booking(&room(), &record).is_none());
        let record = serde_json::json!({
            "StartDateTime": "not a date",
            "EndDateTime": "2025-08-11T01:00:00.000Z"
        });
        assert!(parse_booking(&room(), &record).is_none());
    }

    #[test]
    fn instant_key_candidates_are_ordered() {
        let record = serde_json::json!({
            "StartDateTime": "2025-08-11T00:00:00Z",
            "startDate": "2000-01-01T00:00:00Z",
            "EndDateTime": "2025-08-11T01:00:00Z"
        });
        let booking = parse_booking(&room(), &record).unwrap();
        assert_eq!(booking.start, "2025-08-11T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }
}

// File: src/config.rs
// Handles application settings (config.toml) and the JSON stores the matcher
// and ignore policy are driven by: friends.json, ignore_rooms.json, rooms.json.
use crate::model::{Room, is_valid_room_code};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_api_base() -> String {
    "https://cyon-syd-v4-api-d1-03.azurewebsites.net".to_string()
}
fn default_worker_limit() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_room_timeout_secs() -> u64 {
    90
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}

/// Booking fields scanned when friends.json does not name its own.
pub const DEFAULT_MATCH_FIELDS: [&str; 4] =
    ["Owner", "BookerEmailAddress", "BookerName", "Reference"];

fn default_match_fields() -> Vec<String> {
    DEFAULT_MATCH_FIELDS.iter().map(|s| s.to_string()).collect()
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Upper bound on concurrent room fetches.
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    /// Timeout for a single HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Budget for one room including retries; a room that blows it counts as
    /// a transient per-room failure, not a pipeline failure.
    #[serde(default = "default_room_timeout_secs")]
    pub room_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            worker_limit: default_worker_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            room_timeout_secs: default_room_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Config {
    /// Load config.toml; a missing file just means defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {:?}; using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn room_timeout(&self) -> Duration {
        Duration::from_secs(self.room_timeout_secs)
    }
}

/// The identifiers we recognise a tracked person by (student numbers or
/// emails, stored lowercase) and the booking fields scanned for them, in
/// scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendSet {
    pub ids: Vec<String>,
    pub fields: Vec<String>,
}

#[derive(Deserialize)]
struct FriendsFile {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default = "default_match_fields")]
    match_fields: Vec<String>,
}

impl FriendSet {
    /// Normalises raw identifiers: trim, lowercase, drop empties and
    /// duplicates. Returns the set plus how many entries were skipped.
    pub fn from_parts(ids: Vec<String>, fields: Vec<String>) -> (Self, usize) {
        let mut skipped = 0;
        let mut clean: Vec<String> = Vec::new();
        for raw in ids {
            let id = raw.trim().to_lowercase();
            if id.is_empty() || id.chars().any(char::is_whitespace) {
                log::warn!("Skipping invalid friend identifier {:?}", raw);
                skipped += 1;
                continue;
            }
            if !clean.contains(&id) {
                clean.push(id);
            }
        }
        (Self { ids: clean, fields }, skipped)
    }

    pub fn load(path: &Path) -> Result<(Self, usize)> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read friends file '{}'", path.display()))?;
        let file: FriendsFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse friends file '{}'", path.display()))?;
        Ok(Self::from_parts(file.ids, file.match_fields))
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Room codes flagged for warning emphasis. Codes are compared exact-string;
/// entries failing the `ddd.dd.dd` pattern are skipped at load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    rooms: HashSet<String>,
}

#[derive(Deserialize)]
struct IgnoreFile {
    #[serde(default)]
    rooms: Vec<String>,
}

impl IgnoreSet {
    pub fn from_codes<I: IntoIterator<Item = String>>(codes: I) -> (Self, usize) {
        let mut skipped = 0;
        let mut rooms = HashSet::new();
        for code in codes {
            if is_valid_room_code(&code) {
                rooms.insert(code);
            } else {
                log::warn!("Skipping invalid ignore-room code {:?}", code);
                skipped += 1;
            }
        }
        (Self { rooms }, skipped)
    }

    pub fn load(path: &Path) -> Result<(Self, usize)> {
        if !path.exists() {
            return Ok((Self::default(), 0));
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ignore file '{}'", path.display()))?;
        let file: IgnoreFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse ignore file '{}'", path.display()))?;
        Ok(Self::from_codes(file.rooms))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rooms.contains(code)
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Validates the tracked-room list: non-empty id, well-formed code, and one
/// room per code (first entry wins). Returns the rooms plus the skip count.
pub fn sanitize_rooms(raw: Vec<Room>) -> (Vec<Room>, usize) {
    let mut skipped = 0;
    let mut seen_codes = HashSet::new();
    let mut rooms = Vec::new();
    for room in raw {
        if room.id.trim().is_empty() {
            log::warn!("Skipping room {:?}: empty identifier", room.name);
            skipped += 1;
            continue;
        }
        if !is_valid_room_code(&room.code) {
            log::warn!("Skipping room {:?}: invalid code {:?}", room.name, room.code);
            skipped += 1;
            continue;
        }
        if !seen_codes.insert(room.code.clone()) {
            log::warn!("Skipping room {:?}: duplicate code {:?}", room.name, room.code);
            skipped += 1;
            continue;
        }
        rooms.push(room);
    }
    (rooms, skipped)
}

pub fn load_rooms(path: &Path) -> Result<(Vec<Room>, usize)> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rooms file '{}'", path.display()))?;
    let raw: Vec<Room> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse rooms file '{}'", path.display()))?;
    Ok(sanitize_rooms(raw))
}

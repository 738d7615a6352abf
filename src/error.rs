// Error types for the booking fetch layer.
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a per-room failure is reported upward. Authorization failures mean the
/// session token needs refreshing; transient failures may succeed on a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Authorization,
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Window start is not strictly before its end. Fatal; the caller must not fetch.
    InvalidWindow {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
    EmptyRoomId,
    EmptyCredential,
    /// The API declined the bearer token (401/403). Never retried.
    Unauthorized { status: u16 },
    /// Any other non-200 status, with the first part of the body kept for diagnostics.
    Status { status: u16, preview: String },
    Network(String),
    Timeout { secs: u64 },
    /// The response body could not be decoded as the expected JSON shape.
    Body(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Unauthorized { .. } => FailureKind::Authorization,
            _ => FailureKind::Transient,
        }
    }

    /// Only network-level hiccups and server-side errors are worth retrying.
    /// Authorization rejections and client errors never change on their own.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::InvalidWindow { start, end } => {
                write!(f, "invalid window: start {} is not before end {}", start, end)
            }
            FetchError::EmptyRoomId => write!(f, "room identifier is empty"),
            FetchError::EmptyCredential => write!(f, "bearer credential is empty"),
            FetchError::Unauthorized { status } => {
                write!(
                    f,
                    "authorization rejected (HTTP {}); refresh the session token",
                    status
                )
            }
            FetchError::Status { status, preview } => write!(f, "HTTP {}: {}", status, preview),
            FetchError::Network(msg) => write!(f, "network error: {}", msg),
            FetchError::Timeout { secs } => write!(f, "timed out after {}s", secs),
            FetchError::Body(msg) => write!(f, "unreadable response body: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

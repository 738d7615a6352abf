// File: src/client/mod.rs
pub mod core;

pub use crate::client::core::{BookingClient, FetchOptions, FetchOutcome, RetryPolicy};

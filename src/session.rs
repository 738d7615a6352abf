//! Extracts the short-lived bearer token from a Playwright `storage_state.json`.
//!
//! The login capture itself happens elsewhere (browser automation); this module
//! only reads its output. The token is kept in memory for the run and is never
//! written back to disk or logged.
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Origin of the booking single-page app inside the captured browser state.
const BOOKER_ORIGIN: &str = "https://resourcebooker.rmit.edu.au";
/// localStorage key whose value holds the session JSON.
const AUTH_STORAGE_KEY: &str = "scientia-session-authorization";

#[derive(Deserialize)]
struct StorageState {
    #[serde(default)]
    origins: Vec<OriginState>,
}

#[derive(Deserialize)]
struct OriginState {
    origin: String,
    #[serde(default, rename = "localStorage")]
    local_storage: Vec<StorageItem>,
}

#[derive(Deserialize)]
struct StorageItem {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct SessionAuth {
    access_token: String,
}

/// Pulls the raw access token out of the captured browser session.
pub fn bearer_from_storage(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read storage state '{}'", path.display()))?;
    let state: StorageState = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse storage state '{}'", path.display()))?;

    let origin = state
        .origins
        .iter()
        .find(|o| o.origin == BOOKER_ORIGIN)
        .ok_or_else(|| anyhow!("Origin {} not found in storage state", BOOKER_ORIGIN))?;

    let item = origin
        .local_storage
        .iter()
        .find(|i| i.name == AUTH_STORAGE_KEY)
        .ok_or_else(|| anyhow!("localStorage key '{}' not found", AUTH_STORAGE_KEY))?;

    let auth: SessionAuth = serde_json::from_str(&item.value)
        .context("Failed to parse session authorization JSON")?;
    if auth.access_token.is_empty() {
        return Err(anyhow!("access_token is empty"));
    }
    Ok(auth.access_token)
}

#[derive(Deserialize)]
struct JwtClaims {
    #[serde(default)]
    exp: i64,
}

/// Best-effort freshness probe: decode the JWT payload (no verification) and
/// require at least five minutes before `exp`. A token we cannot parse counts
/// as fresh; the fetch itself is the final judge.
pub fn token_is_fresh(token: &str) -> bool {
    let Some(payload_b64) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(payload) = URL_SAFE_NO_PAD.decode(payload_b64) else {
        return true;
    };
    let Ok(claims) = serde_json::from_slice::<JwtClaims>(&payload) else {
        return true;
    };
    if claims.exp == 0 {
        return true;
    }
    claims.exp > Utc::now().timestamp() + 300
}

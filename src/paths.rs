// File: src/paths.rs
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment override for the whole config/data directory. Set by `--root`
/// and by tests that need filesystem isolation.
pub const ROOT_ENV: &str = "ROOMWEEK_DIR";

pub struct AppPaths;

impl AppPaths {
    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "roomweek", "roomweek")
    }

    /// Helper to ensure a directory exists before returning it.
    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        if let Ok(root) = env::var(ROOT_ENV) {
            return Self::ensure_exists(PathBuf::from(root));
        }
        let proj = Self::get_proj_dirs()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::ensure_exists(proj.config_dir().to_path_buf())
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// friends.json: {"ids": [...], "match_fields": [...]}
    pub fn friends_file() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("friends.json"))
    }

    /// ignore_rooms.json: {"rooms": ["080.10.04", ...]}
    pub fn ignore_rooms_file() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("ignore_rooms.json"))
    }

    /// rooms.json: [{"id": "<uuid>", "code": "010.05.68", "name": "..."}, ...]
    pub fn rooms_file() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("rooms.json"))
    }

    /// Playwright storage_state.json produced by the login capture. Holds the
    /// session; never committed, never copied elsewhere.
    pub fn storage_state_file() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("storage_state.json"))
    }
}

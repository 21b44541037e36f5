//! Application configuration management.
//!
//! This module handles loading and saving the library configuration: the
//! backend base URL, the cache tunables, and the sync debounce window.
//!
//! Configuration is stored at `~/.config/larder/config.json`. Every field
//! has a default, so a missing or partial file works.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::cache::{
    StalenessPolicy, DEFAULT_VISITED_CAPACITY, FEED_TTL_MINUTES, VISITED_STALE_MINUTES,
};
use crate::sync::DEFAULT_SYNC_DEBOUNCE_MS;

/// Application name used for config/data directory paths
const APP_NAME: &str = "larder";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recipe backend.
    pub api_base_url: String,
    /// Bearer token for authenticated requests, if signed in.
    pub api_token: Option<String>,
    /// Feed time-to-live in minutes, applied while online.
    pub feed_ttl_minutes: i64,
    /// Age in minutes past which a visited recipe revalidates in the
    /// background.
    pub visited_stale_minutes: i64,
    /// Bound on locally kept visited recipes.
    pub visited_capacity: usize,
    /// Debounce window for pantry pushes, in milliseconds.
    pub sync_debounce_ms: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            api_token: None,
            feed_ttl_minutes: FEED_TTL_MINUTES,
            visited_stale_minutes: VISITED_STALE_MINUTES,
            visited_capacity: DEFAULT_VISITED_CAPACITY,
            sync_debounce_ms: DEFAULT_SYNC_DEBOUNCE_MS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the cache files and the pantry snapshot.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn feed_policy(&self) -> StalenessPolicy {
        StalenessPolicy::new(Duration::minutes(self.feed_ttl_minutes), true)
    }

    pub fn visited_policy(&self) -> StalenessPolicy {
        StalenessPolicy::new(Duration::minutes(self.visited_stale_minutes), false)
    }

    pub fn sync_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sync_debounce_ms)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

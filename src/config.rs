//! Configuration module for feedkit

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::paths;

/// Which backend variant the feed endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFlavor {
    /// Plain REST backend: `pageSize`/`userId`, bearer token only
    Generic,
    /// WordPress/BuddyBoss activity proxy: `per_page`/`user_id`, `X-WP-Token`
    #[default]
    Buddyboss,
}

impl BackendFlavor {
    /// Query parameter carrying the page size
    pub const fn page_size_param(&self) -> &'static str {
        match self {
            Self::Generic => "pageSize",
            Self::Buddyboss => "per_page",
        }
    }

    /// Query parameter carrying the user filter
    pub const fn user_param(&self) -> &'static str {
        match self {
            Self::Generic => "userId",
            Self::Buddyboss => "user_id",
        }
    }

    /// Whether the WordPress token header is sent on feed requests
    pub const fn sends_wp_token(&self) -> bool {
        matches!(self, Self::Buddyboss)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// API root, e.g. `https://app.bosnett.com/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Backend variant behind the feed endpoint
    #[serde(default)]
    pub backend: BackendFlavor,

    /// Feed endpoint path (relative to `base_url`)
    #[serde(default = "default_feed_path")]
    pub feed_path: String,

    /// Reactions endpoint path (relative to `base_url`)
    #[serde(default = "default_reactions_path")]
    pub reactions_path: String,

    /// Login endpoint path (relative to `base_url`)
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Number of posts per feed page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Quiet period before a typed search is sent, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://app.bosnett.com/api/v1".to_string()
}

fn default_feed_path() -> String {
    "newsfeed".to_string()
}

fn default_reactions_path() -> String {
    "users/likes".to_string()
}

fn default_login_path() -> String {
    "login".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            backend: BackendFlavor::default(),
            feed_path: default_feed_path(),
            reactions_path: default_reactions_path(),
            login_path: default_login_path(),
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Page size, never below 1
    pub fn page_size(&self) -> u32 {
        self.page_size.max(1)
    }

    /// Search debounce window
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Request timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for a path below `base_url`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

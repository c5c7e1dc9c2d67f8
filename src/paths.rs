//! Common paths for feedkit data storage
//!
//! All feedkit data is stored under ~/.config/feedkit/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted tokens

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the feedkit data directory (~/.config/feedkit/)
pub fn feedkit_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("feedkit");
    fs::create_dir_all(&dir).context("Failed to create feedkit directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/feedkit/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(feedkit_dir()?.join("config.toml"))
}

/// Get the credentials file path (~/.config/feedkit/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(feedkit_dir()?.join("credentials.enc"))
}

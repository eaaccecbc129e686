//! User-level configuration (~/.config/jb/config.toml)
//!
//! Machine-specific defaults that should NOT be committed to version control,
//! such as where packages are vendored or which git binary to use.
//! Command-line flags always take precedence over these values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration loaded from ~/.config/jb/config.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
    /// Vendor directory packages are installed into
    pub home: Option<PathBuf>,
    /// Number of concurrent fetches
    pub jobs: Option<usize>,
    /// Cancel installs that take longer than this many seconds
    pub timeout_secs: Option<u64>,
    /// git executable (name on PATH or absolute path)
    pub git: Option<String>,
}

/// Get the user config directory path.
///
/// Returns `~/.config/jb/` on Unix and `%APPDATA%\jb\` on Windows.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("jb"))
}

/// Get the user config file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|p| p.join("config.toml"))
}

/// Load user configuration from the default location.
///
/// Returns `None` if the config file doesn't exist.
pub fn load_user_config() -> Result<Option<UserConfig>> {
    match get_config_path() {
        Some(path) => load_user_config_from(&path),
        None => Ok(None),
    }
}

/// Load user configuration from a specific file.
///
/// Returns an error if the file exists but is invalid TOML or has invalid values.
pub fn load_user_config_from(config_path: &Path) -> Result<Option<UserConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(config_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read user config at {}: {}",
            config_path.display(),
            e
        ))
    })?;

    let config: UserConfig = toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse user config at {}: {}",
            config_path.display(),
            e
        ))
    })?;

    if config.jobs == Some(0) {
        return Err(Error::Config(format!(
            "jobs in {} must be at least 1",
            config_path.display()
        )));
    }

    Ok(Some(config))
}

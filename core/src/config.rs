// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::error::{Error, Result};

/// The name of the application.
pub const APP_NAME: &str = "davsync";

/// Configuration for the sync engine.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the cache database and sync markers.
    ///
    /// `None` after [`Config::normalize`] means an in-memory cache without markers.
    pub state_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Redirect hops followed on regular requests and per discovery run.
    pub max_redirects: usize,

    /// Sync interval for connections added without one.
    pub default_sync_interval_secs: i64,

    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: None,
            request_timeout_secs: 30,
            max_redirects: 3,
            default_sync_interval_secs: 3600,
            user_agent: None,
        }
    }
}

impl Config {
    /// Configuration for an in-memory cache, used by tests and one-off runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Normalize the configuration.
    ///
    /// Expands `~` and environment prefixes in `state_dir`, and falls back to
    /// the user state directory when none is set.
    pub fn normalize(&mut self) -> Result<()> {
        match &self.state_dir {
            Some(a) => {
                self.state_dir = Some(expand_path(a).map_err(|e| {
                    Error::Config(format!("Failed to expand state directory path: {e}"))
                })?);
            }

            None => match get_state_dir() {
                Ok(a) => self.state_dir = Some(a.join(APP_NAME)),
                Err(e) => tracing::warn!(err = %e, "failed to get state directory"),
            },
        }

        Ok(())
    }

    pub(crate) fn dav_config(
        &self,
        base_url: &str,
        auth: davsync_dav::AuthMethod,
    ) -> davsync_dav::DavConfig {
        let mut config = davsync_dav::DavConfig::new(base_url, auth);
        config.timeout_secs = self.request_timeout_secs;
        config.max_redirects = self.max_redirects;
        if let Some(ua) = &self.user_agent {
            config.user_agent.clone_from(ua);
        }
        config
    }
}

/// Handle tilde (~) and environment variables in the path
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path
        .to_str()
        .ok_or_else(|| Error::Config("Invalid path".into()))?;

    // Handle tilde and home directory
    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    // Handle config directories
    let config_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_CONFIG_HOME/", "${XDG_CONFIG_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in config_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_config_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Config("User-specific home directory not found".into()))
}

/// The user configuration directory.
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| Error::Config("User-specific config directory not found".into()))
}

fn get_state_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_dir();
    state_dir.ok_or_else(|| Error::Config("User-specific state directory not found".into()))
}

/// Parse a duration string in the format "HH:MM" / "1d" / "24h" / "60m" / "1800s".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let invalid = || Error::Config(format!("Invalid duration format: {s}"));
    let num = |v: &str| v.trim().parse::<i64>().map_err(|_| invalid());

    // Try to parse "HH:MM" format
    if let Some((h, m)) = s.split_once(':') {
        Ok(Duration::minutes(num(h)? * 60 + num(m)?))
    }
    // Match suffix-based formats
    else if let Some(rest) = s.strip_suffix('d') {
        Ok(Duration::days(num(rest)?))
    } else if let Some(rest) = s.strip_suffix('h') {
        Ok(Duration::hours(num(rest)?))
    } else if let Some(rest) = s.strip_suffix('m') {
        Ok(Duration::minutes(num(rest)?))
    } else if let Some(rest) = s.strip_suffix('s') {
        Ok(Duration::seconds(num(rest)?))
    } else {
        Ok(Duration::seconds(num(s)?))
    }
}

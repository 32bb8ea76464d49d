//! # Configuration
//!
//! [`ChannelConfig`] holds everything needed to reach the focus gateway.
//!
//! ## Loading Priority
//!
//! Configuration is loaded from the first source that provides a value:
//!
//! 1. Explicit struct fields (programmatic construction)
//! 2. Environment variables (`FOCUS_WS_URL`)
//! 3. TOML config file at an explicit path
//! 4. `./focus.toml` in the current directory
//! 5. `~/.config/focus-channel/focus.toml`
//!
//! The URL can always be overridden by `FOCUS_WS_URL`, even when
//! loading from a file.

use serde::{Deserialize, Serialize};
#[cfg(feature = "config-toml")]
use std::path::{Path, PathBuf};

#[cfg(feature = "config-toml")]
use crate::error::ChannelError;
use crate::error::ChannelResult;

/// Default focus gateway WebSocket URL.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:8080";

/// Default correlated call timeout in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5000;

/// Default WebSocket handshake timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Configuration for the focus channel.
///
/// # Examples
///
/// ## Programmatic
///
/// ```
/// use focus_channel::config::ChannelConfig;
///
/// let config = ChannelConfig::new("ws://localhost:8080");
/// ```
///
/// ## From environment variables
///
/// ```no_run
/// use focus_channel::config::ChannelConfig;
///
/// // Optionally set FOCUS_WS_URL, then:
/// let config = ChannelConfig::from_env();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket URL of the focus gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Timeout settings for channel operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for individual correlated calls, in milliseconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,

    /// Timeout for the WebSocket handshake, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

// ─── Defaults ───────────────────────────────────────────────────────────

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY_URL)
    }
}

// ─── ChannelConfig impl ─────────────────────────────────────────────────

impl ChannelConfig {
    /// Create a config for the given gateway URL (all other fields use defaults).
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Load config from environment variables.
    ///
    /// Reads `FOCUS_WS_URL`; falls back to [`DEFAULT_GATEWAY_URL`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("FOCUS_WS_URL") {
            config.gateway_url = url;
        }
        config
    }

    /// Load config from a TOML file, with environment variable overrides.
    ///
    /// `FOCUS_WS_URL` takes precedence over the file value.
    #[cfg(feature = "config-toml")]
    pub fn from_file(path: impl AsRef<Path>) -> ChannelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ChannelError::Config {
            reason: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config: Self = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("FOCUS_WS_URL") {
            config.gateway_url = url;
        }

        Ok(config)
    }

    /// Discover and load config from the standard search path:
    ///
    /// 1. Explicit path (if `Some`)
    /// 2. `FOCUS_CONFIG` environment variable
    /// 3. `./focus.toml`
    /// 4. `~/.config/focus-channel/focus.toml`
    ///
    /// Falls back to environment-variable-only config if no file is found.
    #[cfg(feature = "config-toml")]
    pub fn discover(explicit_path: Option<&Path>) -> ChannelResult<Self> {
        // 1. Explicit path
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. FOCUS_CONFIG env var
        if let Ok(path) = std::env::var("FOCUS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // 3. ./focus.toml
        let local_path = PathBuf::from("focus.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        // 4. ~/.config/focus-channel/focus.toml
        if let Some(config_path) = dirs_config_path() {
            if config_path.exists() {
                return Self::from_file(&config_path);
            }
        }

        // 5. Environment variables only
        Ok(Self::from_env())
    }

    /// Convenience: discover without a feature gate dance at call sites.
    #[cfg(not(feature = "config-toml"))]
    pub fn discover(_explicit_path: Option<&std::path::Path>) -> ChannelResult<Self> {
        Ok(Self::from_env())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

/// Platform-appropriate config file path.
#[cfg(feature = "config-toml")]
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("focus-channel").join("focus.toml"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(|dir| {
            PathBuf::from(dir)
                .join(".config")
                .join("focus-channel")
                .join("focus.toml")
        })
    }
}

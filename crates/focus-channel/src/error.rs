//! # Error Types
//!
//! Semantic error types for the focus channel. Every variant carries
//! enough context to diagnose the problem without digging through logs.
//!
//! A failed call never poisons the channel: all of these reject the one
//! `call()` that was awaiting an outcome, and other pending calls and
//! registered observers keep working.

use thiserror::Error;

/// Convenient Result alias for channel operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// All errors that can surface from the focus channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    // ─── Connection ─────────────────────────────────────────────────
    /// Failed to open the WebSocket, or it closed before opening.
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// The connection was lost after being established.
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// A send was attempted while the connection is not open.
    #[error("Not connected to the focus gateway")]
    NotConnected,

    // ─── Correlated calls ───────────────────────────────────────────
    /// The server answered with an error frame. `scope` is the `where`
    /// tag the server attached, when it attached one.
    #[error("Server error{}: {message}", .scope.as_deref().map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        scope: Option<String>,
        message: String,
    },

    /// No correlated reply arrived within the deadline.
    #[error("Timed out after {millis}ms waiting for '{event}'")]
    Timeout { event: String, millis: u64 },

    /// A reply arrived but did not have the expected shape.
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    // ─── Config ─────────────────────────────────────────────────────
    /// Configuration file error (missing, malformed, or invalid values).
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // ─── Transport / I/O ────────────────────────────────────────────
    /// Low-level WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Filesystem or I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChannelError {
    /// Returns `true` if this error indicates the connection is dead
    /// and a fresh `connect()` is needed before the next operation.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ChannelError::ConnectFailed { .. }
                | ChannelError::ConnectionLost { .. }
                | ChannelError::NotConnected
                | ChannelError::WebSocket(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::WebSocket(err.to_string())
    }
}

#[cfg(feature = "config-toml")]
impl From<toml::de::Error> for ChannelError {
    fn from(err: toml::de::Error) -> Self {
        ChannelError::Config {
            reason: err.to_string(),
        }
    }
}

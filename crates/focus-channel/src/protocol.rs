//! Wire protocol structures for the focus gateway.
//!
//! Outbound messages are single JSON text frames tagged by a `type`
//! field; inbound messages are `{"event": <name>, "data": <payload>}`
//! frames. Event name constants live in [`Events`], error scope tags
//! in [`ErrorScopes`].

use serde::{Deserialize, Serialize};

/// Outbound request frames, tagged by their `type` field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Authenticate an existing account.
    Login { username: String, password: String },
    /// Create a new account.
    Register { username: String, password: String },
    /// Begin a focus session.
    StartSession,
    /// End the current focus session.
    EndSession,
    /// Fetch the caller's profile.
    GetProfile,
    /// Fetch the leaderboard.
    GetLeaderboard,
    /// Push one engagement frame (opaque encoded payload, no reply).
    StreamFrame { data: String },
}

/// One decoded inbound frame: a named event plus its payload.
///
/// Built by the dispatcher's decode step, which drops frames without
/// an event name rather than treating them as errors.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub event: String,
    pub data: serde_json::Value,
}

/// Inbound event names pushed by the gateway.
pub struct Events;

impl Events {
    /// Login succeeded.
    pub const LOGIN_OK: &'static str = "login_ok";

    /// Registration succeeded.
    pub const REGISTER_OK: &'static str = "register_ok";

    /// A focus session has started.
    pub const SESSION_STARTED: &'static str = "session_started";

    /// Result payload for a finished session (seconds, coins earned).
    pub const SESSION_RESULT: &'static str = "session_result";

    /// Profile payload for the logged-in user.
    pub const PROFILE: &'static str = "profile";

    /// Leaderboard payload.
    pub const LEADERBOARD: &'static str = "leaderboard";

    /// Unsolicited focus warning pushed during a session.
    pub const FOCUS_WARN: &'static str = "focus_warn";

    /// Generic error frame carrying `{where, message}`.
    pub const ERROR: &'static str = "error";
}

/// `where` tags the gateway attaches to error frames, used to scope an
/// error to the operation that caused it.
pub struct ErrorScopes;

impl ErrorScopes {
    pub const LOGIN: &'static str = "login";
    pub const REGISTER: &'static str = "register";
}

/// Payload of an [`Events::ERROR`] frame.
///
/// `where` names the operation the error is scoped to; a missing or
/// null `where` means the error is unscoped and settles any pending
/// call that has no scope filter of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "where", default)]
    pub scope: Option<String>,
    #[serde(default = "default_error_message")]
    pub message: String,
}

fn default_error_message() -> String {
    "Server error".to_string()
}

impl ErrorPayload {
    /// Lenient parse: a malformed error payload still settles calls,
    /// with the fallback message.
    pub fn from_value(data: &serde_json::Value) -> Self {
        serde_json::from_value(data.clone()).unwrap_or_else(|_| Self {
            scope: None,
            message: default_error_message(),
        })
    }
}

// ─── Typed reply payloads ───────────────────────────────────────────────
//
// All fields default so a partial gateway payload still parses.

/// Payload of [`Events::SESSION_RESULT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionResult {
    /// Session length in seconds.
    #[serde(default)]
    pub seconds: u64,
    /// Coins awarded for the session.
    #[serde(default)]
    pub coins: u64,
}

/// Payload of [`Events::PROFILE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub seconds: u64,
}

/// One row of the [`Events::LEADERBOARD`] payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub sessions: u64,
}

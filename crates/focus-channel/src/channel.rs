//! # Focus Channel
//!
//! The correlated event channel: multiplexes the named operations of
//! the focus protocol over one persistent WebSocket connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                  FocusChannel                      │
//! │                                                    │
//! │  transport.send() ◄── call() / send_frame()        │
//! │                                                    │
//! │  reader loop (spawned by Transport):               │
//! │    inbound frame ──► Dispatcher ─┬─► pending call  │
//! │                                  │   (success evt) │
//! │                                  ├─► pending call  │
//! │                                  │   (error scope) │
//! │                                  └─► external      │
//! │                                      observers     │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Each [`call`](FocusChannel::call) registers a one-shot observer on
//! its success event and one on the generic `error` event, sends the
//! request, and races three outcomes: success frame, error frame whose
//! `where` tag matches the call's scope, or timeout. Whichever occurs
//! first settles the call exactly once; the losing observers are
//! deregistered and any late frame is inert. Multiple calls may be
//! outstanding at once, each correlated independently by event name.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::config::ChannelConfig;
use crate::dispatcher::{Dispatcher, Subscription};
use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{
    ClientRequest, ErrorPayload, ErrorScopes, Events, LeaderboardEntry, Profile, SessionResult,
};
use crate::transport::{ConnectionState, Transport};

/// Correlated event channel to the focus gateway.
///
/// Construct one per gateway at the application's composition root and
/// share it by reference; it owns the connection, the observer
/// registrations, and all pending calls.
///
/// ```no_run
/// use focus_channel::{ChannelConfig, FocusChannel};
///
/// # async fn demo() -> focus_channel::ChannelResult<()> {
/// let channel = FocusChannel::new(&ChannelConfig::from_env());
///
/// channel.login("demo", "demo123").await?;
/// channel.start_session().await?;
/// channel.send_frame("aGVsbG8=").await?;
/// let result = channel.end_session().await?;
/// println!("earned {} coins", result.coins);
/// # Ok(())
/// # }
/// ```
pub struct FocusChannel {
    transport: Arc<Transport>,
    dispatcher: Arc<Dispatcher>,
    call_timeout: Duration,
}

impl FocusChannel {
    /// Create a channel for the configured gateway. No connection is
    /// opened until the first operation needs one.
    pub fn new(config: &ChannelConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let transport = Arc::new(Transport::new(config, Arc::clone(&dispatcher)));
        Self {
            transport,
            dispatcher,
            call_timeout: Duration::from_millis(config.timeouts.call_timeout_ms),
        }
    }

    /// Open the connection now instead of on first use. Idempotent;
    /// concurrent callers share one attempt.
    pub async fn connect(&self) -> ChannelResult<()> {
        self.transport.connect().await
    }

    /// Close the connection. Pending calls run out their timeouts; a
    /// later operation re-dials on demand.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.transport.state().await
    }

    /// The transport underneath, for state assertions and diagnostics.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Register an observer for a pushed event (e.g.
    /// [`Events::FOCUS_WARN`]). Observers are independent of pending
    /// calls: they fire for every matching frame, awaited or not.
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.dispatcher.on(event, handler)
    }

    /// Observe the gateway's focus warnings.
    pub fn on_warning(
        &self,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.on(Events::FOCUS_WARN, handler)
    }

    // ─── Call correlation ───────────────────────────────────────────

    /// Send `request` and await the first of: a frame named
    /// `success_event` (resolves with its payload), an error frame
    /// scoped to `error_scope` (rejects with [`ChannelError::Remote`];
    /// an unscoped call matches only untagged error frames), or
    /// `timeout` (rejects with [`ChannelError::Timeout`]).
    pub async fn call(
        &self,
        request: &ClientRequest,
        success_event: &'static str,
        timeout: Duration,
        error_scope: Option<&'static str>,
    ) -> ChannelResult<serde_json::Value> {
        let (tx, mut rx) = oneshot::channel::<ChannelResult<serde_json::Value>>();

        // Single-use settlement slot: whichever outcome takes the
        // sender first wins, and late frames find it empty.
        let settle = Arc::new(Mutex::new(Some(tx)));

        let on_success = {
            let settle = Arc::clone(&settle);
            self.dispatcher.on(success_event, move |data| {
                if let Some(tx) = settle.lock().expect("settlement slot poisoned").take() {
                    let _ = tx.send(Ok(data.clone()));
                }
            })
        };

        let on_error = {
            let settle = Arc::clone(&settle);
            self.dispatcher.on(Events::ERROR, move |data| {
                let payload = ErrorPayload::from_value(data);
                // Errors tagged for other operations do not settle
                // this call; an unscoped call only matches untagged
                // error frames.
                let matches_scope = match error_scope {
                    Some(scope) => payload.scope.as_deref() == Some(scope),
                    None => payload.scope.is_none(),
                };
                if matches_scope {
                    if let Some(tx) = settle.lock().expect("settlement slot poisoned").take() {
                        let _ = tx.send(Err(ChannelError::Remote {
                            scope: payload.scope,
                            message: payload.message,
                        }));
                    }
                }
            })
        };

        let outcome = match self.transport.send(request).await {
            Ok(()) => match tokio::time::timeout(timeout, &mut rx).await {
                Ok(Ok(outcome)) => outcome,
                // Sender dropped without settling: only possible if the
                // dispatcher itself went away with the channel.
                Ok(Err(_)) => Err(ChannelError::ConnectionLost {
                    reason: "settlement channel dropped".into(),
                }),
                Err(_) => {
                    tracing::debug!(event = success_event, ?timeout, "Call timed out");
                    // Claim the slot so a frame racing the timeout is inert.
                    let already_settled = settle
                        .lock()
                        .expect("settlement slot poisoned")
                        .take()
                        .is_none();
                    if already_settled {
                        // The frame won the race after all; take its outcome.
                        rx.await.unwrap_or(Err(ChannelError::ConnectionLost {
                            reason: "settlement channel dropped".into(),
                        }))
                    } else {
                        Err(ChannelError::Timeout {
                            event: success_event.to_string(),
                            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        })
                    }
                }
            },
            Err(e) => Err(e),
        };

        on_success.cancel();
        on_error.cancel();
        outcome
    }

    /// [`call`](Self::call) with the configured default timeout.
    async fn call_default(
        &self,
        request: &ClientRequest,
        success_event: &'static str,
        error_scope: Option<&'static str>,
    ) -> ChannelResult<serde_json::Value> {
        self.call(request, success_event, self.call_timeout, error_scope)
            .await
    }

    fn parse<T: serde::de::DeserializeOwned>(
        event: &str,
        value: serde_json::Value,
    ) -> ChannelResult<T> {
        serde_json::from_value(value).map_err(|e| ChannelError::Protocol {
            reason: format!("Failed to parse '{event}' payload: {e}"),
        })
    }

    // ─── Named operations ───────────────────────────────────────────

    /// Authenticate with the gateway.
    pub async fn login(&self, username: &str, password: &str) -> ChannelResult<()> {
        self.call_default(
            &ClientRequest::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            Events::LOGIN_OK,
            Some(ErrorScopes::LOGIN),
        )
        .await?;

        tracing::info!(username, "Logged in");
        Ok(())
    }

    /// Create an account.
    pub async fn register(&self, username: &str, password: &str) -> ChannelResult<()> {
        self.call_default(
            &ClientRequest::Register {
                username: username.to_string(),
                password: password.to_string(),
            },
            Events::REGISTER_OK,
            Some(ErrorScopes::REGISTER),
        )
        .await?;

        tracing::info!(username, "Account registered");
        Ok(())
    }

    /// Begin a focus session.
    pub async fn start_session(&self) -> ChannelResult<()> {
        self.call_default(&ClientRequest::StartSession, Events::SESSION_STARTED, None)
            .await?;

        tracing::info!("Session started");
        Ok(())
    }

    /// End the current session, returning its result (duration and
    /// coins awarded).
    pub async fn end_session(&self) -> ChannelResult<SessionResult> {
        let value = self
            .call_default(&ClientRequest::EndSession, Events::SESSION_RESULT, None)
            .await?;

        let result: SessionResult = Self::parse(Events::SESSION_RESULT, value)?;
        tracing::info!(seconds = result.seconds, coins = result.coins, "Session ended");
        Ok(result)
    }

    /// Fetch the logged-in user's profile.
    pub async fn get_profile(&self) -> ChannelResult<Profile> {
        let value = self
            .call_default(&ClientRequest::GetProfile, Events::PROFILE, None)
            .await?;

        Self::parse(Events::PROFILE, value)
    }

    /// Fetch the leaderboard.
    pub async fn get_leaderboard(&self) -> ChannelResult<Vec<LeaderboardEntry>> {
        let value = self
            .call_default(&ClientRequest::GetLeaderboard, Events::LEADERBOARD, None)
            .await?;

        Self::parse(Events::LEADERBOARD, value)
    }

    /// Push one engagement frame. Fire-and-forget: no pending call is
    /// created and no reply is awaited — this only requires the
    /// connection to be open (connecting on demand like any send).
    pub async fn send_frame(&self, data: &str) -> ChannelResult<()> {
        self.transport
            .send(&ClientRequest::StreamFrame {
                data: data.to_string(),
            })
            .await
    }
}

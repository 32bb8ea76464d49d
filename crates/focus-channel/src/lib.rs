//! # focus-channel
//!
//! Async client for the focus gateway's bidirectional WebSocket
//! protocol: correlated request/response calls and pushed-event
//! observation over one shared connection.
//!
//! ## Features
//!
//! - **Lazy, shared connection**: the first operation dials; concurrent
//!   callers share the in-flight attempt, and at most one physical
//!   connection exists at a time
//! - **Correlated calls**: each request awaits its success event, a
//!   scoped error frame, or a timeout — whichever comes first, settled
//!   exactly once
//! - **Pushed-event observers**: register handlers for unsolicited
//!   events such as focus warnings, independent of pending calls
//! - **Fire-and-forget streaming**: engagement frames go out without a
//!   pending call
//! - **Resilient decoding**: malformed inbound frames are logged and
//!   dropped, never fatal
//!
//! ## Quick Start
//!
//! ```no_run
//! use focus_channel::{ChannelConfig, FocusChannel};
//!
//! #[tokio::main]
//! async fn main() -> focus_channel::ChannelResult<()> {
//!     let channel = FocusChannel::new(&ChannelConfig::from_env());
//!
//!     channel.login("demo", "demo123").await?;
//!
//!     let _warnings = channel.on_warning(|data| {
//!         println!("focus warning: {data}");
//!     });
//!
//!     channel.start_session().await?;
//!     channel.send_frame("aGVsbG8=").await?;
//!     let result = channel.end_session().await?;
//!     println!("{} seconds, {} coins", result.seconds, result.coins);
//!
//!     channel.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`channel`] | [`FocusChannel`]: call correlation and named operations |
//! | [`transport`] | Connection lifecycle, reader loop, frame writes |
//! | [`dispatcher`] | Inbound frame decoding and observer fan-out |
//! | [`protocol`] | Wire structures: requests, events, typed payloads |
//! | [`config`] | Gateway URL and timeouts, from env or TOML |
//! | [`error`] | [`ChannelError`] taxonomy |

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod transport;

pub use channel::FocusChannel;
pub use config::{ChannelConfig, TimeoutConfig};
pub use dispatcher::{Dispatcher, HandlerId, Subscription};
pub use error::{ChannelError, ChannelResult};
pub use protocol::{
    ClientRequest, ErrorPayload, ErrorScopes, Events, InboundFrame, LeaderboardEntry, Profile,
    SessionResult,
};
pub use transport::{ConnectionState, Transport};

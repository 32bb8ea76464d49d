//! # Transport Lifecycle
//!
//! Owns the one physical WebSocket connection to the focus gateway and
//! its `Idle → Connecting → Open → Closed` state machine.
//!
//! The connection is established lazily: [`Transport::send`] calls
//! [`Transport::connect`] first, so the first operation after
//! construction (or after a drop) dials on demand. `connect()` is
//! idempotent and concurrency-safe — callers racing while the
//! handshake is in flight share one attempt through a `watch` channel,
//! and at most one physical connection exists at a time.
//!
//! Once open, the socket is split: the writer half is shared behind a
//! mutex for sends, and a spawned reader loop forwards every inbound
//! text frame verbatim to the [`Dispatcher`] — the transport performs
//! no interpretation of payload content. When the gateway closes the
//! socket or the read fails, the state resets to `Idle` so the next
//! operation re-dials; the transport itself never retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::ChannelConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ChannelError, ChannelResult};

/// Type alias for the write half of the WebSocket connection.
type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Type alias for the read half of the WebSocket connection.
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Externally observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the next operation will dial.
    Idle,
    /// A handshake is in flight.
    Connecting,
    /// The socket is open and ready to send.
    Open,
    /// Explicitly closed via [`Transport::disconnect`].
    Closed,
}

/// Outcome of an in-flight dial, broadcast to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DialOutcome {
    Pending,
    Open,
    Failed(String),
}

enum Link {
    Idle,
    Connecting(watch::Receiver<DialOutcome>),
    Open {
        writer: Arc<Mutex<WsWriter>>,
        epoch: u64,
    },
    Closed,
}

/// The one physical connection to the focus gateway.
pub struct Transport {
    url: String,
    connect_timeout: Duration,
    link: Arc<Mutex<Link>>,
    dispatcher: Arc<Dispatcher>,
    /// Distinguishes connections so a stale reader loop from a dropped
    /// socket cannot clobber a newer link.
    epoch: AtomicU64,
    /// Successful open transitions, observable by tests.
    opens: AtomicU64,
}

impl Transport {
    pub fn new(config: &ChannelConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            url: config.gateway_url.clone(),
            connect_timeout: Duration::from_millis(config.timeouts.connect_timeout_ms),
            link: Arc::new(Mutex::new(Link::Idle)),
            dispatcher,
            epoch: AtomicU64::new(0),
            opens: AtomicU64::new(0),
        }
    }

    /// The gateway URL this transport dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        match &*self.link.lock().await {
            Link::Idle => ConnectionState::Idle,
            Link::Connecting(_) => ConnectionState::Connecting,
            Link::Open { .. } => ConnectionState::Open,
            Link::Closed => ConnectionState::Closed,
        }
    }

    /// Number of successful open transitions over the transport's lifetime.
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Ensure the connection is open, dialing if necessary.
    ///
    /// - `Open`: returns immediately.
    /// - `Connecting`: awaits the in-flight attempt; no second physical
    ///   connection is opened.
    /// - `Idle`/`Closed`: dials, resolving on first successful open or
    ///   failing with [`ChannelError::ConnectFailed`] if the handshake
    ///   errors or the socket closes before opening.
    pub async fn connect(&self) -> ChannelResult<()> {
        let mut rx = {
            let mut link = self.link.lock().await;
            match &*link {
                Link::Open { .. } => return Ok(()),
                Link::Connecting(rx) => rx.clone(),
                Link::Idle | Link::Closed => {
                    let (tx, rx) = watch::channel(DialOutcome::Pending);
                    *link = Link::Connecting(rx);
                    drop(link);
                    // This caller performs the dial; everyone else
                    // waits on the receiver.
                    return self.dial(tx).await;
                }
            }
        };

        loop {
            if rx.changed().await.is_err() {
                // The dialing task was dropped mid-handshake. Reset so
                // the next call can start over.
                let mut link = self.link.lock().await;
                if matches!(&*link, Link::Connecting(_)) {
                    *link = Link::Idle;
                }
                return Err(ChannelError::ConnectFailed {
                    url: self.url.clone(),
                    reason: "connection attempt aborted".into(),
                });
            }
            let outcome = rx.borrow_and_update().clone();
            match outcome {
                DialOutcome::Pending => {}
                DialOutcome::Open => return Ok(()),
                DialOutcome::Failed(reason) => {
                    return Err(ChannelError::ConnectFailed {
                        url: self.url.clone(),
                        reason,
                    });
                }
            }
        }
    }

    /// Perform the handshake and install the open link.
    async fn dial(&self, tx: watch::Sender<DialOutcome>) -> ChannelResult<()> {
        tracing::debug!(url = %self.url, "Dialing focus gateway");

        let result = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| format!("handshake timed out after {:?}", self.connect_timeout))
            .and_then(|r| r.map_err(|e| e.to_string()));

        let mut link = self.link.lock().await;
        match result {
            Ok((ws, response)) => {
                if !matches!(&*link, Link::Connecting(_)) {
                    // disconnect() won the race; do not resurrect the link.
                    let reason = "connection attempt superseded".to_string();
                    let _ = tx.send(DialOutcome::Failed(reason.clone()));
                    return Err(ChannelError::ConnectFailed {
                        url: self.url.clone(),
                        reason,
                    });
                }

                tracing::info!(url = %self.url, status = %response.status(), "Connected to focus gateway");

                let (writer, reader) = ws.split();
                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                *link = Link::Open {
                    writer: Arc::new(Mutex::new(writer)),
                    epoch,
                };
                self.opens.fetch_add(1, Ordering::SeqCst);
                drop(link);

                Self::spawn_reader_loop(
                    reader,
                    Arc::clone(&self.link),
                    Arc::clone(&self.dispatcher),
                    epoch,
                );

                let _ = tx.send(DialOutcome::Open);
                Ok(())
            }
            Err(reason) => {
                if matches!(&*link, Link::Connecting(_)) {
                    *link = Link::Idle;
                }
                drop(link);

                tracing::warn!(url = %self.url, %reason, "Connection attempt failed");
                let _ = tx.send(DialOutcome::Failed(reason.clone()));
                Err(ChannelError::ConnectFailed {
                    url: self.url.clone(),
                    reason,
                })
            }
        }
    }

    /// Forward every inbound text frame to the dispatcher until the
    /// socket closes, then reset the link so the next send re-dials.
    fn spawn_reader_loop(
        mut reader: WsReader,
        link: Arc<Mutex<Link>>,
        dispatcher: Arc<Dispatcher>,
        epoch: u64,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(msg) = reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        tracing::debug!(raw = %text, "Reader loop received message");
                        dispatcher.handle_raw(&text);
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Focus gateway closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        break;
                    }
                    Ok(_) => {
                        // Binary messages, pings, pongs — skip
                    }
                }
            }

            // Only reset if this reader's connection is still the
            // current one; a newer link must not be clobbered.
            let mut link = link.lock().await;
            if matches!(&*link, Link::Open { epoch: e, .. } if *e == epoch) {
                tracing::info!("Connection lost; transport reset to idle");
                *link = Link::Idle;
            }
        })
    }

    /// Serialize `payload` and write it as one text frame, connecting
    /// on demand first.
    pub async fn send<T: Serialize>(&self, payload: &T) -> ChannelResult<()> {
        self.connect().await?;

        let writer = {
            let link = self.link.lock().await;
            match &*link {
                Link::Open { writer, .. } => Arc::clone(writer),
                _ => return Err(ChannelError::NotConnected),
            }
        };

        let json = serde_json::to_string(payload)?;
        tracing::debug!(frame = %json, "Sending frame");

        writer
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ChannelError::WebSocket(format!("Send error: {e}")))
    }

    /// Close the connection explicitly. The state becomes [`ConnectionState::Closed`];
    /// a later operation re-dials on demand.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if let Link::Open { writer, .. } = std::mem::replace(&mut *link, Link::Closed) {
            let _ = writer.lock().await.close().await;
            tracing::info!(url = %self.url, "Disconnected from focus gateway");
        }
    }
}

//! # Event Dispatcher
//!
//! Decodes raw inbound text into [`InboundFrame`]s and fans each frame
//! out to the observers registered for its event name.
//!
//! Decoding is forgiving: malformed JSON and frames without an `event`
//! field are logged and dropped, never surfaced — one bad frame must
//! not interrupt channel operation. Fan-out iterates a snapshot of the
//! registration list taken at dispatch time, so handlers added or
//! removed mid-dispatch do not affect the current pass, and a
//! panicking handler cannot prevent the rest from running.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::InboundFrame;

/// Observer callback invoked with the frame payload.
pub type EventHandler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Identifies one registration so it can be removed individually even
/// when several handlers share an event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: EventHandler,
}

/// Registration map from event name to handlers, privately owned and
/// mutated only through [`on`](Dispatcher::on) / [`off`](Dispatcher::off).
pub struct Dispatcher {
    listeners: Mutex<HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Parse a raw text message into an [`InboundFrame`].
    ///
    /// Returns `None` for malformed JSON (logged at `warn`) and for
    /// frames without an `event` name (discarded, not an error).
    pub fn decode(raw: &str) -> Option<InboundFrame> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable inbound frame");
                return None;
            }
        };

        let event = value.get("event")?.as_str()?.to_string();
        let data = value.get("data").cloned().unwrap_or(serde_json::Value::Null);
        Some(InboundFrame { event, data })
    }

    /// Register `handler` for frames named `event`.
    ///
    /// Handlers for the same event are invoked in registration order.
    /// The returned [`Subscription`] is the deregistration handle; the
    /// handler stays registered until [`Subscription::cancel`] is
    /// called or the dispatcher is dropped.
    pub fn on(
        self: &Arc<Self>,
        event: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Subscription {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut listeners = self.listeners.lock().expect("listener map poisoned");
        listeners.entry(event.to_string()).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });

        Subscription {
            dispatcher: Arc::clone(self),
            event: event.to_string(),
            id,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Remove one registration; no-op if it is not present.
    pub fn off(&self, event: &str, id: HandlerId) {
        let mut listeners = self.listeners.lock().expect("listener map poisoned");
        if let Some(registrations) = listeners.get_mut(event) {
            registrations.retain(|r| r.id != id);
            if registrations.is_empty() {
                listeners.remove(event);
            }
        }
    }

    /// Decode a raw message and fan it out. Called by the transport
    /// reader loop for every inbound text frame.
    pub fn handle_raw(&self, raw: &str) {
        if let Some(frame) = Self::decode(raw) {
            self.dispatch(&frame);
        }
    }

    /// Invoke every handler currently registered for the frame's event.
    pub fn dispatch(&self, frame: &InboundFrame) {
        // Snapshot before invoking: handlers registered or removed
        // during this pass do not affect it.
        let snapshot: Vec<EventHandler> = {
            let listeners = self.listeners.lock().expect("listener map poisoned");
            match listeners.get(&frame.event) {
                Some(registrations) => {
                    registrations.iter().map(|r| Arc::clone(&r.handler)).collect()
                }
                None => return,
            }
        };

        tracing::debug!(event = %frame.event, handlers = snapshot.len(), "Dispatching frame");

        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(&frame.data))).is_err() {
                tracing::warn!(event = %frame.event, "Event handler panicked; continuing fan-out");
            }
        }
    }

    #[cfg(test)]
    fn handler_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .expect("listener map poisoned")
            .get(event)
            .map_or(0, Vec::len)
    }
}

/// Deregistration handle returned by [`Dispatcher::on`].
///
/// Dropping a `Subscription` does NOT deregister the handler — the
/// lifetime is caller-managed. [`cancel`](Self::cancel) is idempotent.
pub struct Subscription {
    dispatcher: Arc<Dispatcher>,
    event: String,
    id: HandlerId,
    cancelled: AtomicBool,
}

impl Subscription {
    /// Remove the handler from the dispatcher. Safe to call repeatedly.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.dispatcher.off(&self.event, self.id);
        }
    }

    /// The event name this subscription observes.
    pub fn event(&self) -> &str {
        &self.event
    }
}

//! SSE forwarding - one outbound event channel per session
//!
//! Wraps the sending half of the channel feeding an axum `Sse` response.
//! Events are framed one JSON payload per `data:` line and delivered in
//! send order. Once the client has gone away (or the session closed the
//! channel), further sends are silent no-ops: a disconnected peer is an
//! expected outcome, never an error the session has to handle.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::response::sse::Event;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// The only failure a forwarder surfaces: the payload itself could not be
/// represented on the wire. That is a bug in the event-producing code and
/// must not be swallowed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("event payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sending side of one live SSE connection
pub struct SseForwarder {
    tx: mpsc::UnboundedSender<Result<Event, Infallible>>,
    closed: AtomicBool,
}

impl SseForwarder {
    /// Create a forwarder and the receiver to hand to `Sse::new`.
    pub fn channel() -> (
        Self,
        mpsc::UnboundedReceiver<Result<Event, Infallible>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Serialize and frame one event. FIFO with respect to other sends.
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<(), ForwardError> {
        if self.is_closed() {
            return Ok(());
        }

        let json = serde_json::to_string(payload)?;
        if self.tx.send(Ok(Event::default().data(json))).is_err() {
            // Receiver dropped: client disconnected mid-send.
            debug!("sse channel closed by peer, dropping event");
            self.closed.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Stop accepting events. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// True once either side has shut the channel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed) || self.tx.is_closed()
    }
}

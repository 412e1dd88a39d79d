//! Cross-window message channel between the popup and its opener.

use crate::error::PopupResult;
use ras_oauth_core::OAuthMessage;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 16;

/// A message as seen by the receiving window: the sender's origin plus the
/// untrusted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub origin: String,
    pub data: serde_json::Value,
}

/// Sending half held by the popup: posts to the window that opened it.
pub trait OpenerPort: Send + Sync {
    /// Deliver `message` only if the opener's origin equals `target_origin`.
    fn post_message(&self, message: &OAuthMessage, target_origin: &str) -> PopupResult<()>;
}

/// The opener's inbound message queue.
///
/// Every subscriber sees every event. Events are delivered regardless of
/// origin; deciding whom to trust is the receiver's job.
#[derive(Debug, Clone)]
pub struct MessageBus {
    origin: String,
    sender: broadcast::Sender<MessageEvent>,
}

impl MessageBus {
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_capacity(origin, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(origin: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            origin: origin.into(),
            sender,
        }
    }

    /// Origin of the window that owns this bus.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.sender.subscribe()
    }

    /// Enqueue a raw event. Returns the number of subscribers reached.
    pub fn dispatch(&self, event: MessageEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// A port through which a window at `source_origin` can post to this bus.
    pub fn opener_port(&self, source_origin: impl Into<String>) -> BusOpenerPort {
        BusOpenerPort {
            bus: self.clone(),
            source_origin: source_origin.into(),
        }
    }
}

/// [`OpenerPort`] backed by a [`MessageBus`].
#[derive(Debug, Clone)]
pub struct BusOpenerPort {
    bus: MessageBus,
    source_origin: String,
}

impl OpenerPort for BusOpenerPort {
    fn post_message(&self, message: &OAuthMessage, target_origin: &str) -> PopupResult<()> {
        if target_origin != self.bus.origin() {
            // Same as a browser: a target origin mismatch drops the message silently.
            debug!(
                "Dropped message for {} (opener is {})",
                target_origin,
                self.bus.origin()
            );
            return Ok(());
        }

        let data = serde_json::to_value(message)?;
        self.bus.dispatch(MessageEvent {
            origin: self.source_origin.clone(),
            data,
        });
        Ok(())
    }
}

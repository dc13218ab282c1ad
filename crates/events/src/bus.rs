//! Broadcast event bus.
//!
//! Producers push into an unbounded mpsc channel (so emitting never blocks a
//! hook worker); a forwarding task republishes every event on a broadcast
//! channel that any number of observers can subscribe to.

use crate::event::HookrunEvent;
use tokio::sync::{broadcast, mpsc};

/// Capacity of the broadcast channel.
const BROADCAST_CAPACITY: usize = 1024;

/// Multi-subscriber event bus.
#[derive(Debug)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<HookrunEvent>,
    broadcast_tx: broadcast::Sender<HookrunEvent>,
}

impl EventBus {
    /// Create a new event bus. Must be called inside a tokio runtime.
    ///
    /// The forwarding task ends once every sender handed out (and the bus
    /// itself) is dropped.
    #[must_use]
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<HookrunEvent>();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        let forward = broadcast_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                // No subscribers is not an error
                let _ = forward.send(event);
            }
        });

        Self {
            sender,
            broadcast_tx,
        }
    }

    /// Get a sender for submitting events.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            inner: self.sender.clone(),
        }
    }

    /// Subscribe to events sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.broadcast_tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Sender handle for submitting events to an [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<HookrunEvent>,
}

impl EventSender {
    /// Raw channel, as consumed by [`crate::HookrunEventLayer`].
    #[must_use]
    pub fn into_inner(self) -> mpsc::UnboundedSender<HookrunEvent> {
        self.inner
    }
}

/// Receiver handle for events from an [`EventBus`].
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<HookrunEvent>,
}

impl EventReceiver {
    /// Receive the next event; `None` once the bus is closed.
    ///
    /// A receiver that falls behind skips the oldest events.
    pub async fn recv(&mut self) -> Option<HookrunEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event receiver lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

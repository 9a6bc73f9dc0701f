//! Event bus - broadcast channel between the registry and event consumers.
//!
//! The registry emits [`DeviceEvent`]s synchronously through an
//! [`EventSender`]; consumers (the notification dispatcher, tests) subscribe
//! and receive asynchronously. Sending never blocks, and a bus with no
//! subscribers is not an error.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::DeviceEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 256;

/// Central hub for device event distribution.
///
/// Uses a broadcast channel so every consumer receives every event.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get a sender for emitting events. Cheaply cloneable.
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Subscribe to receive all events emitted after this call.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Used by the registry to emit events.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventSender {
    /// Emit an event, returning the number of receivers it reached.
    /// Zero receivers just means nobody is listening yet.
    pub fn emit(&self, event: DeviceEvent) -> usize {
        let type_name = event.type_name();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type = type_name, receivers = count, "event emitted");
                count
            }
            Err(_) => {
                debug!(event_type = type_name, "no receivers for event");
                0
            }
        }
    }

    /// Whether anyone is subscribed.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Used by consumers to receive events in an async loop.
pub struct EventReceiver {
    receiver: broadcast::Receiver<DeviceEvent>,
}

impl EventReceiver {
    /// Receive the next event, or `None` once the bus is closed.
    /// A lagged receiver logs the skip count and keeps going.
    pub async fn recv(&mut self) -> Option<DeviceEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped_events = skipped, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event bus closed");
                    return None;
                }
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<DeviceEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped_events = skipped, "event receiver lagged on try_recv");
                self.receiver.try_recv().ok()
            }
            Err(_) => None,
        }
    }
}

//! Broadcast bus carrying chat state notifications

use tokio::sync::broadcast;

use crate::types::{ChatEvent, EventEnvelope};

/// Notifications are small and views drain them promptly.
const CAPACITY: usize = 256;

/// Fan-out of [`ChatEvent`]s to any number of views.
///
/// Slow subscribers lag rather than block the publisher; a lagged receiver
/// sees `RecvError::Lagged` and should re-read the full state.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Wrap `event` in an envelope and deliver it.
    ///
    /// Returns how many subscribers received it; with none the event is dropped.
    pub fn emit(&self, event: ChatEvent) -> usize {
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Only events emitted after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

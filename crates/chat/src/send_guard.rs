//! RAII guard for the in-flight window of a send.
//!
//! `send_message` commits the optimistic user message and the `Sending`
//! state before it awaits the transport. If that future is dropped before
//! the reply is applied (a timeout, a `select!` branch losing, an aborted
//! task), the guard rolls both back so the chat does not stay busy.

use std::sync::Arc;

use events::{ChatEvent, EventBus};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::state::ChatState;
use crate::state_machine::SendState;

pub(crate) struct SendGuard {
    state: Arc<RwLock<ChatState>>,
    events: EventBus,
    session_id: String,
    optimistic_id: String,
    completed: bool,
}

impl SendGuard {
    pub(crate) fn new(
        state: Arc<RwLock<ChatState>>,
        events: EventBus,
        session_id: String,
        optimistic_id: String,
    ) -> Self {
        Self {
            state,
            events,
            session_id,
            optimistic_id,
            completed: false,
        }
    }

    /// The caller holds the state lock and settles the send itself.
    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }
}

fn roll_back(
    mut state: RwLockWriteGuard<'_, ChatState>,
    events: &EventBus,
    session_id: &str,
    optimistic_id: &str,
) {
    state.send_state = SendState::Idle;
    let removed = state.messages.remove(optimistic_id).is_some();
    let count = state.messages.len();
    drop(state);

    if removed {
        events.emit(ChatEvent::MessagesChanged {
            session_id: Some(session_id.to_string()),
            count,
        });
    }
    events.emit(ChatEvent::LoadingChanged { loading: false });
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }

        warn!(
            session_id = %self.session_id,
            message_id = %self.optimistic_id,
            "Send dropped before completion, rolling back"
        );

        if let Ok(state) = self.state.try_write() {
            roll_back(state, &self.events, &self.session_id, &self.optimistic_id);
            return;
        }

        // Lock is queued to another task; finish the rollback once it is ours.
        let state = self.state.clone();
        let events = self.events.clone();
        let session_id = std::mem::take(&mut self.session_id);
        let optimistic_id = std::mem::take(&mut self.optimistic_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let guard = state.write().await;
                    roll_back(guard, &events, &session_id, &optimistic_id);
                });
            }
            Err(_) => debug!("No runtime to finish send rollback"),
        }
    }
}

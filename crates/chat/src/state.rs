use uibuilder_core::{Message, SessionSummary};

use crate::message_store::MessageStore;
use crate::session_store::SessionStore;
use crate::state_machine::SendState;

/// Everything a view renders: the session list, the active session, its
/// messages, the send flag and the last error.
///
/// Only the orchestrator mutates it; views get clones via
/// [`ChatOrchestrator::snapshot`](crate::ChatOrchestrator::snapshot).
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub(crate) sessions: SessionStore,
    pub(crate) messages: MessageStore,
    pub(crate) current_session_id: Option<String>,
    pub(crate) send_state: SendState,
    pub(crate) error: Option<String>,
    /// Bumped whenever the active session changes. Responses started under
    /// an older generation must not touch the message list.
    pub(crate) generation: u64,
}

impl ChatState {
    pub fn sessions(&self) -> &[SessionSummary] {
        self.sessions.as_slice()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&SessionSummary> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.sessions.get(id))
    }

    pub fn is_loading(&self) -> bool {
        self.send_state.is_sending()
    }

    pub fn send_state(&self) -> SendState {
        self.send_state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Questions of the latest message when it is an assistant clarification.
    pub fn follow_up_questions(&self) -> &[String] {
        self.messages
            .last()
            .map(|m| m.follow_up_questions())
            .unwrap_or(&[])
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Switch the active session and empty the message list.
    pub(crate) fn activate(&mut self, session_id: Option<String>) {
        self.current_session_id = session_id;
        self.messages.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns true when the slot actually changed.
    pub(crate) fn set_error(&mut self, error: Option<String>) -> bool {
        if self.error == error {
            return false;
        }
        self.error = error;
        true
    }
}

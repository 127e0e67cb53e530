use crate::error::{ChatError, Result};

/// Send lifecycle of the chat. `Sending` is what views render as "loading".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
}

impl SendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
        }
    }

    pub fn is_sending(&self) -> bool {
        matches!(self, Self::Sending)
    }
}

pub struct SendStateMachine;

impl SendStateMachine {
    /// At most one send may be in flight at a time.
    pub fn validate_transition(from: &SendState, to: &SendState) -> Result<()> {
        match (from, to) {
            (SendState::Idle, SendState::Sending) | (SendState::Sending, SendState::Idle) => Ok(()),
            (SendState::Sending, SendState::Sending) => Err(ChatError::SendInProgress),
            (SendState::Idle, SendState::Idle) => Err(ChatError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }

    pub fn can_transition(from: &SendState, to: &SendState) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}

use thiserror::Error;
use uibuilder_client::ClientError;

/// Failure of a chat operation.
///
/// The `Display` text is the fixed message shown to the user; transport
/// detail stays in the source error.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to load sessions.")]
    LoadSessions(#[source] ClientError),

    #[error("Failed to create session.")]
    CreateSession(#[source] ClientError),

    #[error("Failed to load messages.")]
    LoadMessages(#[source] ClientError),

    #[error("Failed to delete session.")]
    DeleteSession(#[source] ClientError),

    #[error("Something went wrong. Please try again.")]
    SendMessage(#[source] ClientError),

    #[error("A message is already being sent.")]
    SendInProgress,

    #[error("Invalid send state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No follow-up question #{0}.")]
    NoSuchQuestion(usize),
}

impl ChatError {
    /// The transport failure behind this error, if it came from the network.
    pub fn transport(&self) -> Option<&ClientError> {
        match self {
            Self::LoadSessions(e)
            | Self::CreateSession(e)
            | Self::LoadMessages(e)
            | Self::DeleteSession(e)
            | Self::SendMessage(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        self.transport().is_some()
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

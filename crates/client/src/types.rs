use serde::{Deserialize, Serialize};

pub use uibuilder_core::{CodeBlock, Message, MessageAction, Role, Session, SessionSummary};

/// Body of `POST /sessions/{id}/messages/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub content: String,
}

impl SendMessageRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

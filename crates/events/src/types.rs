//! Event types for chat state notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: ChatEvent,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: ChatEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// A piece of chat state changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The session list was replaced, extended, shrunk or a title changed
    #[serde(rename = "sessions.changed")]
    SessionsChanged { count: usize },

    /// The active session changed (or was cleared)
    #[serde(rename = "session.activated")]
    ActiveSessionChanged { session_id: Option<String> },

    /// The message list of the active session changed
    #[serde(rename = "messages.changed")]
    MessagesChanged {
        session_id: Option<String>,
        count: usize,
    },

    /// A send started or finished
    #[serde(rename = "loading.changed")]
    LoadingChanged { loading: bool },

    /// The last-error slot was set or cleared
    #[serde(rename = "error.changed")]
    ErrorChanged { error: Option<String> },
}

impl ChatEvent {
    /// Session the event refers to, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ChatEvent::ActiveSessionChanged { session_id } => session_id.as_deref(),
            ChatEvent::MessagesChanged { session_id, .. } => session_id.as_deref(),
            ChatEvent::SessionsChanged { .. }
            | ChatEvent::LoadingChanged { .. }
            | ChatEvent::ErrorChanged { .. } => None,
        }
    }
}

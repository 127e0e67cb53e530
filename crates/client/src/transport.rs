use async_trait::async_trait;

use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{Message, Session, SessionSummary};

/// Request/response operations against the chat service.
///
/// Implementations perform a single round-trip per call: no retries, no
/// caching, no side effects beyond the request itself.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Create an empty session
    async fn create_session(&self) -> Result<Session>;

    /// List summaries of all sessions
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Fetch a session including its messages
    async fn get_session(&self, session_id: &str) -> Result<Session>;

    /// Delete a session and its messages
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Send user content and return the assistant's reply
    async fn send_message(&self, session_id: &str, content: &str) -> Result<Message>;

    /// Fetch only the messages of a session
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>>;
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn create_session(&self) -> Result<Session> {
        ApiClient::create_session(self).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        ApiClient::list_sessions(self).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        ApiClient::get_session(self, session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        ApiClient::delete_session(self, session_id).await
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<Message> {
        ApiClient::send_message(self, session_id, content).await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        ApiClient::list_messages(self, session_id).await
    }
}

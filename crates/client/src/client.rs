use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::types::{Message, SendMessageRequest, Session, SessionSummary};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the chat API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL including any path prefix, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Whole-request timeout enforced by the HTTP client
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            client,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::with_client(config.base_url.clone(), client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_session(&self) -> Result<Session> {
        let url = self.url(&["sessions"])?;
        debug!(%url, "POST create session");

        let response = self.client.post(url).send().await?;
        self.handle_response(response).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let url = self.url(&["sessions"])?;
        debug!(%url, "GET list sessions");

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let url = self.url(&["sessions", session_id])?;
        debug!(%url, "GET session");

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.url(&["sessions", session_id])?;
        debug!(%url, "DELETE session");

        let response = self.client.delete(url).send().await?;
        self.check_status(response).await?;
        Ok(())
    }

    pub async fn send_message(&self, session_id: &str, content: &str) -> Result<Message> {
        let url = self.url(&["sessions", session_id, "messages"])?;
        debug!(%url, "POST message");

        let response = self
            .client
            .post(url)
            .json(&SendMessageRequest::new(content))
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let url = self.url(&["sessions", session_id, "messages"])?;
        debug!(%url, "GET messages");

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// `base_url` plus `segments`, each percent-encoded as a single path
    /// segment, with the trailing slash the API expects.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let url = response.url().to_string();
            warn!(%url, "Resource not found");
            return Err(ClientError::NotFound(url));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Request failed");
            return Err(ClientError::Status { status, body });
        }

        Ok(response)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = self.check_status(response).await?;
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)?;
        Ok(body)
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

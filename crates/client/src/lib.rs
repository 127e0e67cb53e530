pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{ApiClient, ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{ClientError, Result};
pub use transport::ChatTransport;
pub use types::*;

pub use reqwest::StatusCode;

//! Grading endpoint client
//!
//! [`GradingEndpoint`] is the seam between the coordinator and the remote
//! import procedure. [`HttpEndpoint`] is the real implementation: one JSON
//! POST per submission, no retries.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::core::request::{ImportRequest, ImportResponse};

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The request could not complete. Always terminal for a submission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Request failed ({0})")]
    Status(u16),

    #[error("Request failed (network error: {0})")]
    Network(String),

    #[error("Request failed ({status}): invalid response body: {message}")]
    InvalidBody { status: u16, message: String },

    #[error("Invalid endpoint configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else if err.is_timeout() {
            TransportError::Network("request timed out".to_string())
        } else if err.is_connect() {
            TransportError::Network("could not connect to grading endpoint".to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Remote procedure that persists an import
#[async_trait]
pub trait GradingEndpoint: Send + Sync {
    /// Send one import request and return the decoded response body
    async fn import_grades(&self, request: &ImportRequest)
        -> Result<ImportResponse, TransportError>;
}

/// JSON-over-HTTP grading endpoint
pub struct HttpEndpoint {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpEndpoint {
    /// Create a client posting to `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(TransportError::Config("endpoint URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("csvgrader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self {
            client,
            url,
            token: None,
        })
    }

    /// Send a bearer token with each request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GradingEndpoint for HttpEndpoint {
    async fn import_grades(
        &self,
        request: &ImportRequest,
    ) -> Result<ImportResponse, TransportError> {
        debug!(
            "POST {} (target {}, max grade {})",
            self.url, request.target_block, request.max_grade
        );

        let mut builder = self.client.post(&self.url).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("grading endpoint answered {}", status);

        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<ImportResponse>()
            .await
            .map_err(|e| TransportError::InvalidBody {
                status: status.as_u16(),
                message: e.to_string(),
            })
    }
}

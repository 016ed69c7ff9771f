//! Submission transport
//!
//! The [`Transport`] trait is the only async seam in the engine. The HTTP
//! implementation posts form-encoded pairs and expects a JSON array of
//! `{type, data}` commands back.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::commands::Command;
use crate::error::TransportError;
use crate::field::FormPayload;

/// Sends a collected payload and returns the server's command batch.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, url: &str, payload: &FormPayload) -> Result<Vec<Command>, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, url: &str, payload: &FormPayload) -> Result<Vec<Command>, TransportError> {
        info!(url = %url, fields = payload.len(), "Submitting form data");

        let response = self
            .client
            .post(url)
            .form(&payload.to_pairs())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Http(format!("HTTP {}", response.status())));
        }

        let body = response.text().await?;
        parse_commands(&body)
    }
}

/// Parse a response body into a command batch.
pub fn parse_commands(body: &str) -> Result<Vec<Command>, TransportError> {
    let commands: Vec<Command> = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
    debug!(count = commands.len(), "Parsed response commands");
    Ok(commands)
}

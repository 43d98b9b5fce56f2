//! HTTP client for the Supermemory memory API.

use crate::error::{MemoryError, Result};
use infichat_core::config::MemoryConfig;
use infichat_core::Credentials;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default memory API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.supermemory.ai";

/// A stored memory as acknowledged by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Storage identifier.
    pub id: String,

    /// Processing status (e.g. "queued", "done").
    #[serde(default)]
    pub status: String,
}

/// A search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHit {
    /// Document the hit belongs to.
    pub document_id: String,

    /// Document title, when the service derived one.
    #[serde(default)]
    pub title: Option<String>,

    /// Relevance score reported by the service.
    #[serde(default)]
    pub score: f64,

    /// Matching chunks.
    #[serde(default)]
    pub chunks: Vec<MemoryChunk>,
}

/// A matching chunk inside a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryChunk {
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest<'a> {
    content: &'a str,
    container_tags: &'a [String],
    metadata: &'a serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    q: &'a str,
    container_tags: &'a [String],
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MemoryHit>,
}

/// Supermemory API client.
pub struct SupermemoryClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    timeout: u64,
}

impl SupermemoryClient {
    /// Create a client with an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MemoryError::Config("API key is required".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| MemoryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: SecretString::new(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: 30,
        })
    }

    /// Create a client from config and credentials.
    pub fn from_config(config: &MemoryConfig, credentials: &Credentials) -> Result<Self> {
        let api_key = credentials.require_supermemory()?;
        Ok(Self::new(api_key.expose_secret())?
            .with_base_url(config.base_url.as_str())
            .with_timeout(config.timeout_secs))
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .timeout(Duration::from_secs(self.timeout))
            .bearer_auth(self.api_key.expose_secret())
    }

    /// Store a memory under the given container tags.
    pub async fn add(
        &self,
        content: &str,
        container_tags: &[String],
        metadata: &serde_json::Value,
    ) -> Result<MemoryRecord> {
        debug!(
            content_len = content.len(),
            tags = ?container_tags,
            "Adding memory"
        );

        let response = self
            .post("/v3/memories")
            .json(&AddRequest {
                content,
                container_tags,
                metadata,
            })
            .send()
            .await?;

        let record: MemoryRecord = read_json(response).await?;
        if record.id.trim().is_empty() {
            return Err(MemoryError::invalid_response("memory id is empty"));
        }
        Ok(record)
    }

    /// Search memories under the given container tags.
    pub async fn search(
        &self,
        query: &str,
        container_tags: &[String],
        limit: usize,
    ) -> Result<Vec<MemoryHit>> {
        debug!(query, tags = ?container_tags, limit, "Searching memories");

        let response = self
            .post("/v3/search")
            .json(&SearchRequest {
                q: query,
                container_tags,
                limit,
            })
            .send()
            .await?;

        let body: SearchResponse = read_json(response).await?;
        Ok(body.results)
    }
}

/// Read a JSON body, mapping failures to memory errors.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(MemoryError::api(status.as_u16(), error_message(&body, status.as_u16())));
    }

    serde_json::from_str(&body).map_err(|e| MemoryError::invalid_response(e.to_string()))
}

/// Pull a readable message out of an error body.
fn error_message(body: &str, status: u16) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
        details: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            message,
            details,
        }) => match (error.or(message), details) {
            (Some(msg), Some(details)) => format!("{}: {}", msg, details),
            (Some(msg), None) => msg,
            (None, Some(details)) => details,
            (None, None) => format!("HTTP {}", status),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => body.trim().to_string(),
    }
}

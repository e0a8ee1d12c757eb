//! Transport gateway: the three backend calls.
//!
//! [`Transport`] is the seam between the job state machine and the network.
//! The state machine only ever sees a raw JSON [`Value`] or a
//! [`TransportError`]; it never inspects HTTP details. Tests drive the state
//! machine through scripted in-memory transports; production code uses
//! [`HttpTransport`].
//!
//! No retries happen here. A failed call surfaces once and the state machine
//! decides what it means for the job.

use crate::config::ClientConfig;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The backend calls the job lifecycle depends on.
///
/// Implementations return `Value::Null` for an empty body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST /upload` with the file as multipart field `file`.
    async fn submit_file(&self, path: &Path) -> Result<Value, TransportError>;

    /// `POST /transcribe` with JSON body `{"url": …}`.
    async fn submit_url(&self, url: &str) -> Result<Value, TransportError>;

    /// `GET /status/{job_id}`.
    async fn fetch_status(&self, job_id: &str) -> Result<Value, TransportError>;
}

/// [`Transport`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), status.canonical_reason(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(parse_body(&body))
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                secs: self.config.request_timeout_secs,
            }
        } else {
            TransportError::Client(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit_file(&self, path: &Path) -> Result<Value, TransportError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TransportError::Client(format!("failed to read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        info!("Uploading {} ({} bytes)", file_name, bytes.len());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        self.send(self.client.post(self.config.endpoint("upload")).multipart(form))
            .await
    }

    async fn submit_url(&self, url: &str) -> Result<Value, TransportError> {
        info!("Submitting URL for transcription: {}", url);
        self.send(
            self.client
                .post(self.config.endpoint("transcribe"))
                .json(&serde_json::json!({ "url": url })),
        )
        .await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Value, TransportError> {
        debug!("GET status for job {}", job_id);
        let url = status_url(&self.config, job_id)?;
        self.send(self.client.get(url)).await
    }
}

/// `{base}/status/{job_id}` with the id percent-encoded as one path segment.
fn status_url(config: &ClientConfig, job_id: &str) -> Result<reqwest::Url, TransportError> {
    let mut url = reqwest::Url::parse(&config.endpoint("status"))
        .map_err(|e| TransportError::Client(format!("invalid base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| TransportError::Client("base URL cannot have a path".to_string()))?
        .push(job_id);
    Ok(url)
}

/// Decode a success body. Empty bodies become `null`; so do bodies that are
/// not JSON, which the normaliser then reports as malformed.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Response body is not JSON ({}); treating as empty", e);
            Value::Null
        }
    }
}

/// Build the error for a non-success response, picking up the `detail` field
/// that FastAPI-style backends put in error bodies.
fn http_error(status: u16, reason: Option<&str>, body: &str) -> TransportError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .and_then(|d| match d {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

    TransportError::Http {
        status,
        status_text: reason.unwrap_or_default().to_string(),
        detail,
    }
}

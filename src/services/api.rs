//! HTTP client for the PPE classification backend.

use crate::models::{ApiSettings, DashboardStats, DetectionRecord, DetectionResult, MediaBlob};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Errors from the detection backend.
///
/// Every variant is recoverable: the selection stays put and the operator
/// can retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Not authorized (HTTP 401)")]
    Unauthorized { detail: Option<String> },

    #[error("Request failed with status code {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// The most specific message available for the operator.
    ///
    /// A server-supplied `detail` wins; otherwise the transport-level text is used.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ApiError::Unauthorized { .. } => {
                "Session expired or token rejected; update the API token and try again".to_string()
            }
            ApiError::Timeout(timeout) => format!("timeout of {}ms exceeded", timeout.as_millis()),
            ApiError::Transport(message) | ApiError::Decode(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Pull a human-readable `detail` out of an error body.
///
/// FastAPI sends either `{"detail": "..."}` or, for validation errors,
/// `{"detail": [{"msg": "..."}, ...]}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        serde_json::Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

/// The multipart payload for `POST /detect`
#[derive(Clone, PartialEq)]
pub struct DetectionRequest {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DetectionRequest {
    pub fn from_blob(blob: &MediaBlob) -> Self {
        let mime = if is_valid_mime(&blob.mime) {
            blob.mime.clone()
        } else {
            FALLBACK_MIME.to_string()
        };

        Self {
            file_name: blob.file_name.clone(),
            mime,
            bytes: blob.bytes.clone(),
        }
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Form::new().part("file", part))
    }
}

impl std::fmt::Debug for DetectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionRequest")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn is_valid_mime(mime: &str) -> bool {
    match mime.split_once('/') {
        Some((kind, sub)) => {
            !kind.is_empty()
                && !sub.is_empty()
                && mime.chars().all(|c| c.is_ascii_graphic() && c != ',')
        }
        None => false,
    }
}

/// Remote detection capability consumed by the console
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionApi: Send + Sync {
    /// `POST /detect`; exactly one attempt, no retry
    async fn submit_media(&self, request: DetectionRequest) -> Result<DetectionResult, ApiError>;

    /// `GET /detections?skip=&limit=`
    async fn list_detections(&self, skip: u32, limit: u32) -> Result<Vec<DetectionRecord>, ApiError>;

    /// `GET /dashboard`
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;
}

/// reqwest-backed [`DetectionApi`]
#[derive(Debug, Clone)]
pub struct HttpDetectionApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDetectionApi {
    /// Build a client from configuration. The bearer token, when set, is
    /// attached to every request.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = settings.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::Transport(format!("Invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = settings.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        tracing::info!(
            "Detection API at {} (timeout {}s, token {})",
            base_url,
            timeout.as_secs(),
            if settings.token().is_some() { "set" } else { "not set" }
        );

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Turn a non-2xx response into an [`ApiError`], reading the body for `detail`
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        tracing::warn!(
            "Detection API returned {}: {}",
            status,
            detail.as_deref().unwrap_or("<no detail>")
        );

        if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized { detail })
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            })
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = request.send().await.map_err(|e| self.map_send_error(e))?;
        let resp = self.check_status(resp).await?;
        resp.json::<T>().await.map_err(|e| self.map_send_error(e))
    }
}

#[async_trait]
impl DetectionApi for HttpDetectionApi {
    async fn submit_media(&self, request: DetectionRequest) -> Result<DetectionResult, ApiError> {
        tracing::info!(
            "Submitting {} ({}, {} bytes) for detection",
            request.file_name,
            request.mime,
            request.bytes.len()
        );

        let form = request.into_form()?;
        self.get_json(self.client.post(self.url("detect")).multipart(form))
            .await
    }

    async fn list_detections(&self, skip: u32, limit: u32) -> Result<Vec<DetectionRecord>, ApiError> {
        tracing::debug!("Fetching detections (skip={}, limit={})", skip, limit);
        self.get_json(
            self.client
                .get(self.url("detections"))
                .query(&[("skip", skip), ("limit", limit)]),
        )
        .await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        tracing::debug!("Fetching dashboard stats");
        self.get_json(self.client.get(self.url("dashboard"))).await
    }
}

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

/// Body of a successful OAuth2 client-credentials response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
}

/// Error envelope returned by the ingestion endpoint, e.g.
/// `{"error": {"code": "BadRequest", "message": "...", "@permanent": true}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceErrorEnvelope {
    pub error: ServiceErrorBody,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ServiceErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "@message")]
    pub detail: Option<String>,
    #[serde(rename = "@permanent")]
    pub permanent: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub permanent: bool,
}

impl ServiceError {
    /// Parses an error body. Falls back to `None` when the body is not the
    /// service's JSON envelope.
    pub(crate) fn parse(status: StatusCode, body: &str) -> Option<Self> {
        let envelope: ServiceErrorEnvelope = serde_json::from_str(body).ok()?;
        let ServiceErrorBody {
            code,
            message,
            detail,
            permanent,
        } = envelope.error;
        let message = match detail {
            Some(detail) if !detail.is_empty() => detail,
            _ => message,
        };
        Some(Self {
            status,
            code,
            message,
            permanent,
        })
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service error {} ({}): {}",
            self.status, self.code, self.message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStatus {
    /// Every payload was accepted by the streaming endpoint.
    Success,
}

/// Result of one `ingest_from_stream` call.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub status: IngestionStatus,
    pub database: String,
    pub table: String,
    pub source_id: Uuid,
    /// Number of POSTs sent to the service.
    pub requests: usize,
    pub bytes: usize,
    /// Newline-delimited records sent; zero for formats that are not line based.
    pub records: usize,
    pub completed_at: jiff::Timestamp,
}

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure. Surfaced untouched; callers may retry at a higher
    /// level, the pipeline never does.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// Terminal authentication failure: the credential expired and could not
    /// be renewed, or the renewed credential was rejected again.
    #[error("authentication expired")]
    AuthenticationExpired,

    /// Non-success response passed through for the consumer to render.
    #[error("request failed: HTTP {status}")]
    Status { status: StatusCode, body: Bytes },

    /// The backend answered successfully but reported failure in its payload
    /// envelope.
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// The server-reported status, when this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

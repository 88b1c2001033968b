//! Error handling and custom error types
//!
//! Provides unified error handling across the studio using thiserror. Upstream
//! failures carry a typed [`UpstreamKind`] so callers never have to inspect
//! provider messages to decide what to do.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load .env file: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read media: {0}")]
    Encoding(#[source] std::io::Error),

    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("No image data found in the response")]
    NoImageReturned,

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("Video submission failed: {0}")]
    Submission(#[source] UpstreamError),

    #[error("Checking operation status failed: {0}")]
    PollingTransport(#[source] UpstreamError),

    #[error("Video generation did not finish within {0:?}")]
    PollingTimeout(Duration),

    #[error("Video generation failed or no URI returned")]
    NoResultUri,

    #[error("Video generation failed: {0}")]
    JobFailed(String),

    #[error("Failed to fetch video: {0}")]
    Download(#[source] UpstreamError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// The upstream failure behind this error, whichever phase raised it.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream(e)
            | Self::Submission(e)
            | Self::PollingTransport(e)
            | Self::Download(e) => Some(e),
            _ => None,
        }
    }

    /// True when the provider rejected the credentials and a new key is needed.
    pub fn requires_reauth(&self) -> bool {
        self.upstream().is_some_and(UpstreamError::requires_reauth)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Machine-checkable classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    AuthInvalid,
    /// The provider reports the model or operation does not exist for this key.
    EntityNotFound,
    RateLimited,
    Server,
    InvalidRequest,
    Transport,
    Malformed,
    Other,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthInvalid => "authentication failed",
            Self::EntityNotFound => "entity not found",
            Self::RateLimited => "rate limited",
            Self::Server => "server error",
            Self::InvalidRequest => "invalid request",
            Self::Transport => "transport error",
            Self::Malformed => "malformed response",
            Self::Other => "upstream error",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone)]
#[error("Gemini API {kind}{}: {message}", status_suffix(.status))]
pub struct UpstreamError {
    pub kind: UpstreamKind,
    pub status: Option<u16>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl UpstreamError {
    pub fn new(kind: UpstreamKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    ///
    /// Google wraps failures as `{"error": {"code", "message", "status", "details"}}`;
    /// the envelope status and `API_KEY_INVALID` reason take priority over the
    /// HTTP code, which is only a fallback for bodies that are not JSON.
    pub fn from_response(status: u16, body: &str) -> Self {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

        let key_invalid = envelope.as_ref().is_some_and(|e| {
            e.error
                .details
                .iter()
                .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
        });
        let rpc_status = envelope.as_ref().and_then(|e| e.error.status.as_deref());

        let kind = if key_invalid {
            UpstreamKind::AuthInvalid
        } else {
            rpc_status
                .and_then(kind_from_rpc_status)
                .unwrap_or_else(|| kind_from_http_status(status))
        };

        let message = envelope
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| body.trim().to_string());

        Self {
            kind,
            status: Some(status),
            message,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            UpstreamKind::Transport | UpstreamKind::RateLimited | UpstreamKind::Server
        )
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self.kind,
            UpstreamKind::AuthInvalid | UpstreamKind::EntityNotFound
        )
    }
}

fn kind_from_rpc_status(status: &str) -> Option<UpstreamKind> {
    match status {
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => Some(UpstreamKind::AuthInvalid),
        "NOT_FOUND" => Some(UpstreamKind::EntityNotFound),
        "RESOURCE_EXHAUSTED" => Some(UpstreamKind::RateLimited),
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => {
            Some(UpstreamKind::InvalidRequest)
        }
        "INTERNAL" | "UNAVAILABLE" | "DEADLINE_EXCEEDED" => Some(UpstreamKind::Server),
        _ => None,
    }
}

fn kind_from_http_status(status: u16) -> UpstreamKind {
    match status {
        401 | 403 => UpstreamKind::AuthInvalid,
        404 => UpstreamKind::EntityNotFound,
        429 => UpstreamKind::RateLimited,
        400 => UpstreamKind::InvalidRequest,
        500..=599 => UpstreamKind::Server,
        _ => UpstreamKind::Other,
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_decode() {
            UpstreamKind::Malformed
        } else {
            UpstreamKind::Transport
        };
        Self {
            kind,
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_invalid_reason_is_auth_even_on_400() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT",
            "details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#;
        let err = UpstreamError::from_response(400, body);
        assert_eq!(err.kind, UpstreamKind::AuthInvalid);
        assert_eq!(err.message, "API key not valid.");
        assert!(err.requires_reauth());
    }

    #[test]
    fn test_not_found_envelope_requires_reauth() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let err = UpstreamError::from_response(404, body);
        assert_eq!(err.kind, UpstreamKind::EntityNotFound);
        assert!(Error::Submission(err).requires_reauth());
    }

    #[test]
    fn test_plain_text_bodies_fall_back_to_http_status() {
        assert_eq!(
            UpstreamError::from_response(429, "quota exceeded").kind,
            UpstreamKind::RateLimited
        );
        assert_eq!(
            UpstreamError::from_response(503, "unavailable").kind,
            UpstreamKind::Server
        );
        assert_eq!(
            UpstreamError::from_response(403, "forbidden").kind,
            UpstreamKind::AuthInvalid
        );
        assert_eq!(
            UpstreamError::from_response(418, "teapot").kind,
            UpstreamKind::Other
        );
    }

    #[test]
    fn test_transient_kinds() {
        assert!(UpstreamError::new(UpstreamKind::Transport, "reset").is_transient());
        assert!(UpstreamError::new(UpstreamKind::Server, "500").is_transient());
        assert!(!UpstreamError::new(UpstreamKind::AuthInvalid, "bad key").is_transient());
        assert!(!UpstreamError::new(UpstreamKind::InvalidRequest, "bad").is_transient());
    }

    #[test]
    fn test_display_includes_status_and_message() {
        let err = UpstreamError::from_response(500, "boom");
        assert_eq!(err.to_string(), "Gemini API server error (status 500): boom");

        let err = UpstreamError::new(UpstreamKind::Transport, "connection reset");
        assert_eq!(err.to_string(), "Gemini API transport error: connection reset");
    }

    #[test]
    fn test_non_upstream_errors_never_require_reauth() {
        assert!(!Error::NoImageReturned.requires_reauth());
        assert!(!Error::Cancelled.requires_reauth());
        assert!(Error::NoResultUri.upstream().is_none());
    }
}

use crate::core::config::ConfigError;
use thiserror::Error;

/// Every failure the client can report.
///
/// The service signals most of its errors through a `ret_msg` text field inside an
/// otherwise successful response, so many of these variants carry the original
/// message verbatim. The type is `Clone` because a single shared operation (a session
/// renewal, a cache fetch, an entity expansion) hands the same outcome to every task
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Request quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Profile is private: {0}")]
    PrivateProfile(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Client is closed")]
    ClientClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ApiError {
    /// Whether the dispatcher may retry the same request after a short backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure(_) | Self::ServiceUnavailable(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 503 => Self::ServiceUnavailable(err.to_string()),
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::TransportFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Message returned by `createsession` when the session was granted.
pub const SESSION_APPROVED: &str = "Approved";

/// Classify a `ret_msg` value into a structured error.
///
/// Returns `None` for messages that do not denote an error (an empty message, or the
/// session approval notice). Anything not recognised becomes `MalformedResponse`.
pub fn classify_ret_msg(message: &str) -> Option<ApiError> {
    let trimmed = message.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(SESSION_APPROVED) {
        return None;
    }

    let lower = trimmed.to_lowercase();
    let owned = trimmed.to_string();
    let error = if lower.contains("invalid session id") {
        ApiError::SessionExpired(owned)
    } else if lower.contains("daily request limit")
        || lower.contains("maximum number of active sessions")
        || lower.contains("session limit")
    {
        ApiError::QuotaExceeded(owned)
    } else if lower.contains("validating developer access")
        || lower.contains("invalid developer id")
        || lower.contains("invalid signature")
        || lower.contains("comparing server and client timestamp")
        || lower.contains("unauthorized")
    {
        ApiError::AuthenticationFailure(owned)
    } else if lower.contains("privacy") || lower.contains("private") {
        ApiError::PrivateProfile(owned)
    } else if lower.contains("not found") || lower.starts_with("no ") {
        ApiError::NotFound(owned)
    } else if lower.contains("unavailable")
        || lower.contains("maintenance")
        || lower.contains("emergency")
    {
        ApiError::ServiceUnavailable(owned)
    } else {
        ApiError::MalformedResponse(owned)
    };
    Some(error)
}

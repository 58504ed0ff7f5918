//! Error types for backend operations.
//!
//! [`BackendError`] covers every way a call to the text-generation server can
//! fail before a response body is in hand. It integrates into the crate-level
//! [`Error`](crate::Error) via `Error::Backend`.

use std::time::Duration;

/// Error type for backend operations.
///
/// Transport failures ([`Unavailable`](Self::Unavailable) and
/// [`Timeout`](Self::Timeout)) are surfaced to the caller immediately and are
/// never retried by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// No response arrived within the deadline.
    #[error("backend timed out: {0}")]
    Timeout(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The backend reported an error in its own error envelope.
    #[error("[{provider}] {message}")]
    Provider {
        /// Provider name (e.g., "ollama").
        provider: String,
        /// Error description.
        message: String,
    },

    /// The response envelope did not have the expected shape.
    #[error("Expected {expected}, got {got}")]
    ResponseFormat {
        /// Expected format description.
        expected: String,
        /// Actual content received.
        got: String,
    },

    /// Failure while reading a streamed response.
    #[error("stream error: {0}")]
    Stream(String),

    /// Feature not supported by this backend.
    #[error("feature not supported: {0}")]
    NotSupported(String),

    /// Internal error (client construction and similar).
    #[error("{0}")]
    Internal(String),
}

impl BackendError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a timeout error for an elapsed caller deadline.
    #[must_use]
    pub fn deadline_elapsed(deadline: Duration) -> Self {
        Self::Timeout(format!("no response within {}ms", deadline.as_millis()))
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a provider-specific error.
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ResponseFormat {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a streaming error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create a not supported error.
    #[must_use]
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::NotSupported(feature.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` for transport-level failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Returns `true` if the backend could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns `true` if the call ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::unavailable(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::stream(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

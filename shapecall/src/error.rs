//! Unified error types for shapecall.
//!
//! This module provides the error hierarchy for operations that can abort an
//! invocation:
//! - Backend errors (unreachable server, timeouts, bad envelopes)
//! - Tool execution errors
//! - Schema conversion errors
//!
//! Decoding a model response never produces an [`Error`]; decode failures are
//! values, see [`DecodeFailure`](crate::decode::DecodeFailure).

pub use crate::llms::error::BackendError;

/// Result type alias for shapecall operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for shapecall.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Tool execution error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Schema conversion error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the backend error, if this is one.
    #[must_use]
    pub const fn as_backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the backend could not be reached.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.as_backend().is_some_and(BackendError::is_unavailable)
    }

    /// Returns `true` if the backend did not answer in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.as_backend().is_some_and(BackendError::is_timeout)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// Error type for tool execution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Error during tool execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found.
    #[error("Tool not found: {0}")]
    NotFound(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

/// Error raised when an external JSON Schema document cannot be mapped onto
/// [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The document root does not describe an object.
    #[error("schema root must describe an object")]
    NotAnObject,

    /// A `$ref` points outside the document's definitions.
    #[error("unresolved reference `{0}`")]
    UnresolvedRef(String),

    /// A construct this crate does not model.
    #[error("unsupported schema at `{path}`: {detail}")]
    Unsupported {
        /// Location of the construct.
        path: String,
        /// What was found.
        detail: String,
    },
}

impl SchemaError {
    /// Create an unsupported-construct error.
    #[must_use]
    pub fn unsupported(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

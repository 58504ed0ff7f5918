//! Turning raw model text into validated values.
//!
//! Decoding is a single best-effort pass with no repair:
//!
//! 1. if the text contains an opening `<tool_call>` marker, the tagged inner
//!    text is extracted ([`TagPair::extract`]);
//! 2. the text is parsed as JSON;
//! 3. the value is validated against the [`Schema`].
//!
//! Every failure is returned as a [`DecodeFailure`] value that keeps the raw
//! text, so callers can log it verbatim, re-prompt or give up.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::schema::{Schema, Violation};
use crate::tool::ToolCall;

/// Opening and closing markers around an embedded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagPair {
    /// Opening marker.
    pub open: &'static str,
    /// Closing marker.
    pub close: &'static str,
}

/// Markers around a single tool call.
pub const TOOL_CALL_TAGS: TagPair = TagPair::new("<tool_call>", "</tool_call>");

/// Markers around the tool signatures offered to the model.
pub const TOOLS_TAGS: TagPair = TagPair::new("<tools>", "</tools>");

/// Markers around a tool result sent back to the model.
pub const TOOL_RESPONSE_TAGS: TagPair = TagPair::new("<tool_response>", "</tool_response>");

impl TagPair {
    /// Create a marker pair.
    #[must_use]
    pub const fn new(open: &'static str, close: &'static str) -> Self {
        Self { open, close }
    }

    /// Whether `text` contains the opening marker.
    #[must_use]
    pub fn is_present(&self, text: &str) -> bool {
        text.contains(self.open)
    }

    /// Returns the trimmed text between the first opening marker and the next
    /// closing marker.
    ///
    /// # Errors
    ///
    /// [`ExtractError::MarkerNotFound`] without an opening marker,
    /// [`ExtractError::UnterminatedMarker`] when no closing marker follows it.
    pub fn extract<'t>(&self, text: &'t str) -> Result<&'t str, ExtractError> {
        let start = text
            .find(self.open)
            .ok_or(ExtractError::MarkerNotFound { marker: self.open })?;
        let rest = &text[start + self.open.len()..];
        let end = rest
            .find(self.close)
            .ok_or(ExtractError::UnterminatedMarker { marker: self.open })?;
        Ok(rest[..end].trim())
    }

    /// Returns every tagged section, in order. No marker at all yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// [`ExtractError::UnterminatedMarker`] if any opening marker is left open.
    pub fn extract_all<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, ExtractError> {
        let mut found = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(self.open) {
            let after = &rest[start + self.open.len()..];
            let end = after
                .find(self.close)
                .ok_or(ExtractError::UnterminatedMarker { marker: self.open })?;
            found.push(after[..end].trim());
            rest = &after[end + self.close.len()..];
        }
        Ok(found)
    }

    /// Surrounds `inner` with the markers, each on its own line.
    #[must_use]
    pub fn wrap(&self, inner: &str) -> String {
        format!("{}\n{inner}\n{}", self.open, self.close)
    }
}

impl Default for TagPair {
    fn default() -> Self {
        TOOL_CALL_TAGS
    }
}

/// Why a tagged section could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The opening marker does not occur.
    #[error("marker `{marker}` not found")]
    MarkerNotFound {
        /// The opening marker looked for.
        marker: &'static str,
    },

    /// The opening marker is not followed by its closing marker.
    #[error("marker `{marker}` is never closed")]
    UnterminatedMarker {
        /// The opening marker left open.
        marker: &'static str,
    },
}

/// Reason code of a failed decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeReason {
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON does not have the declared shape.
    #[error("schema mismatch at `{path}`: {detail}")]
    SchemaMismatch {
        /// Path of the offending value; empty for the root.
        path: String,
        /// What was wrong.
        detail: String,
    },

    /// A required field is absent or `null`.
    #[error("missing required field `{0}`")]
    MissingRequiredField(String),
}

impl From<Violation> for DecodeReason {
    fn from(violation: Violation) -> Self {
        match violation {
            Violation::MissingField { path } => Self::MissingRequiredField(path),
            other => Self::SchemaMismatch {
                path: other.path().to_owned(),
                detail: other.to_string(),
            },
        }
    }
}

/// A failed decode, carrying the untouched raw text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DecodeFailure {
    /// The response text exactly as received.
    pub raw: String,
    /// What went wrong.
    pub reason: DecodeReason,
}

impl DecodeFailure {
    /// Create a failure for `raw`.
    #[must_use]
    pub fn new(raw: impl Into<String>, reason: DecodeReason) -> Self {
        Self {
            raw: raw.into(),
            reason,
        }
    }
}

/// Outcome of decoding a response against a schema.
pub type ParsedResult = Result<Value, DecodeFailure>;

/// Decodes `raw` against `schema`, unwrapping a `<tool_call>` section first
/// when one is present.
///
/// # Errors
///
/// Returns a [`DecodeFailure`] with reason [`DecodeReason::InvalidJson`],
/// [`DecodeReason::SchemaMismatch`] or [`DecodeReason::MissingRequiredField`].
pub fn decode(raw: &str, schema: &Schema) -> ParsedResult {
    decode_tagged(raw, schema, TOOL_CALL_TAGS)
}

/// Like [`decode`], with a custom marker pair.
///
/// Text without the opening marker is parsed unchanged. An opening marker
/// without its closing marker is reported as [`DecodeReason::InvalidJson`].
///
/// # Errors
///
/// See [`decode`].
pub fn decode_tagged(raw: &str, schema: &Schema, tags: TagPair) -> ParsedResult {
    let result = decode_inner(raw, schema, tags);
    if let Err(reason) = &result {
        tracing::warn!(%reason, raw_len = raw.len(), "response did not decode");
    }
    result.map_err(|reason| DecodeFailure::new(raw, reason))
}

fn decode_inner(raw: &str, schema: &Schema, tags: TagPair) -> Result<Value, DecodeReason> {
    let text = match tags.extract(raw) {
        Ok(inner) => inner,
        Err(ExtractError::MarkerNotFound { .. }) => raw,
        Err(err @ ExtractError::UnterminatedMarker { .. }) => {
            return Err(DecodeReason::InvalidJson(err.to_string()));
        }
    };
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| DecodeReason::InvalidJson(e.to_string()))?;
    schema.validate(&value)?;
    Ok(value)
}

/// Decodes `raw` and deserializes the validated value into `T`.
///
/// # Errors
///
/// Everything [`decode`] reports, plus [`DecodeReason::SchemaMismatch`] when
/// the value does not deserialize into `T`.
pub fn decode_as<T: DeserializeOwned>(raw: &str, schema: &Schema) -> Result<T, DecodeFailure> {
    let value = decode(raw, schema)?;
    serde_json::from_value(value).map_err(|e| {
        DecodeFailure::new(
            raw,
            DecodeReason::SchemaMismatch {
                path: String::new(),
                detail: e.to_string(),
            },
        )
    })
}

/// Why a tagged tool call could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ToolCallError {
    /// No `<tool_call>` marker in the text.
    #[error("no tool call marker found")]
    MarkerNotFound,

    /// A `<tool_call>` marker is never closed.
    #[error("tool call marker is never closed")]
    UnterminatedMarker,

    /// The tagged text is not `{"name": string, "arguments": object}`.
    #[error("malformed tool call: {0}")]
    MalformedInnerJson(String),
}

impl From<ExtractError> for ToolCallError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::MarkerNotFound { .. } => Self::MarkerNotFound,
            ExtractError::UnterminatedMarker { .. } => Self::UnterminatedMarker,
        }
    }
}

/// Reads the first `<tool_call>` section of `text`.
///
/// # Errors
///
/// Returns a [`ToolCallError`] naming the failure.
pub fn parse_tool_call(text: &str) -> Result<ToolCall, ToolCallError> {
    read_tool_call(TOOL_CALL_TAGS.extract(text)?)
}

/// Reads every `<tool_call>` section of `text`, in order.
///
/// # Errors
///
/// [`ToolCallError::MarkerNotFound`] when there is none, otherwise the first
/// failure encountered.
pub fn parse_tool_calls(text: &str) -> Result<Vec<ToolCall>, ToolCallError> {
    let sections = TOOL_CALL_TAGS.extract_all(text)?;
    if sections.is_empty() {
        return Err(ToolCallError::MarkerNotFound);
    }
    sections.into_iter().map(read_tool_call).collect()
}

fn read_tool_call(inner: &str) -> Result<ToolCall, ToolCallError> {
    let value: Value = serde_json::from_str(inner)
        .map_err(|e| ToolCallError::MalformedInnerJson(e.to_string()))?;
    Schema::function_call()
        .validate(&value)
        .map_err(|v| ToolCallError::MalformedInnerJson(v.to_string()))?;
    serde_json::from_value(value).map_err(|e| ToolCallError::MalformedInnerJson(e.to_string()))
}

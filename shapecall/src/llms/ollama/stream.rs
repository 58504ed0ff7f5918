//! Ollama stream parsing.
//!
//! Ollama streams NDJSON: one JSON object per line, the last one carrying
//! `"done": true`. An `{"error": ...}` line may replace a chunk when the server
//! fails mid-generation.

use serde::de::DeserializeOwned;

use crate::error::{BackendError, Result};
use crate::stream::StreamEvent;

use super::types::{OllamaChatResponse, OllamaErrorResponse, OllamaGenerateResponse};

/// Parse one line of a streamed `/api/chat` response.
pub fn parse_chat_line(line: &str) -> Result<StreamEvent> {
    let chunk: OllamaChatResponse = parse_line(line)?;
    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    if chunk.done {
        tracing::debug!(
            done_reason = chunk.done_reason.as_deref().unwrap_or("stop"),
            eval_count = chunk.eval_count,
            "Ollama chat stream finished"
        );
        return Ok(StreamEvent::Done(text));
    }
    Ok(StreamEvent::Text(text))
}

/// Parse one line of a streamed `/api/generate` response.
pub fn parse_generate_line(line: &str) -> Result<StreamEvent> {
    let chunk: OllamaGenerateResponse = parse_line(line)?;
    if chunk.done {
        return Ok(StreamEvent::Done(chunk.response));
    }
    Ok(StreamEvent::Text(chunk.response))
}

fn parse_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    let line = line.trim();
    if let Ok(error) = serde_json::from_str::<OllamaErrorResponse>(line) {
        return Err(BackendError::provider("ollama", error.error).into());
    }
    serde_json::from_str(line).map_err(|e| {
        tracing::warn!("Failed to parse Ollama chunk: {e}, line: {line}");
        BackendError::stream(format!("Parse error: {e}")).into()
    })
}

//! Ollama Backend implementation.

use async_trait::async_trait;

use crate::backend::{Backend, ChatRequest, ChatResponse, GenerateRequest, Usage};
use crate::error::{BackendError, Result};
use crate::message::Message;
use crate::stream::{TextStream, ndjson_text_stream};

use super::client::Ollama;
use super::stream::{parse_chat_line, parse_generate_line};
use super::types::{OllamaChatResponse, OllamaGenerateResponse};

impl Ollama {
    /// Parse the response into ChatResponse.
    fn parse_response(response: OllamaChatResponse) -> ChatResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(input), Some(output)) => Some(Usage::new(input, output)),
            _ => None,
        };

        ChatResponse {
            message: Message::assistant(response.message.map(|m| m.content).unwrap_or_default()),
            model: response.model,
            done_reason: response.done_reason,
            usage,
        }
    }

    fn parse_body<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            BackendError::response_format(
                "valid Ollama response",
                format!("parse error: {e}, response: {text}"),
            )
            .into()
        })
    }
}

#[async_trait]
impl Backend for Ollama {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_chat_body(request, false);
        let response = self.post(&self.chat_url(), &body).await?;

        let response_text = response.text().await?;
        tracing::debug!(bytes = response_text.len(), "received Ollama chat response");
        let parsed: OllamaChatResponse = Self::parse_body(&response_text)?;

        Ok(Self::parse_response(parsed))
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        let body = self.build_chat_body(request, true);
        let response = self.post(&self.chat_url(), &body).await?;

        Ok(ndjson_text_stream(response.bytes_stream(), parse_chat_line))
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let body = self.build_generate_body(request, false);
        let response = self.post(&self.generate_url(), &body).await?;

        let response_text = response.text().await?;
        tracing::debug!(bytes = response_text.len(), "received Ollama generate response");
        let parsed: OllamaGenerateResponse = Self::parse_body(&response_text)?;

        Ok(parsed.response)
    }

    async fn generate_stream(&self, request: &GenerateRequest) -> Result<TextStream> {
        let body = self.build_generate_body(request, true);
        let response = self.post(&self.generate_url(), &body).await?;

        Ok(ndjson_text_stream(response.bytes_stream(), parse_generate_line))
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        self.model()
    }
}

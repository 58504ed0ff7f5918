//! Ollama API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;

use crate::backend::{ChatRequest, GenerateRequest};
use crate::error::{BackendError, Result};
use crate::message::Message;
use crate::request::GenerationOptions;

use super::config::OllamaConfig;
use super::types::{
    OllamaChatRequest, OllamaErrorResponse, OllamaGenerateRequest, OllamaMessage, OllamaOptions,
};

/// Ollama API client.
///
/// Cheap to clone: the configuration is shared and `reqwest::Client` is
/// reference-counted.
#[derive(Debug, Clone)]
pub struct Ollama {
    pub(crate) config: Arc<OllamaConfig>,
    pub(crate) http_client: Client,
}

impl Ollama {
    /// Create a new Ollama client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let http_client = builder
            .build()
            .map_err(|e| BackendError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// See [`Ollama::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(OllamaConfig::default())
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Ollama::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the chat API URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the generate API URL.
    pub(crate) fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.model)
            .to_owned()
    }

    fn convert_options(options: &GenerationOptions) -> Option<OllamaOptions> {
        options.temperature.map(|temperature| OllamaOptions {
            temperature: Some(temperature),
        })
    }

    /// Convert Message to Ollama format.
    pub(crate) fn convert_message(msg: &Message) -> OllamaMessage {
        OllamaMessage {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }

    /// Build the `/api/chat` request body.
    pub(crate) fn build_chat_body(&self, request: &ChatRequest, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.resolve_model(request.model.as_deref()),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            format: request.options.format.to_wire(),
            options: Self::convert_options(&request.options),
            stream,
            keep_alive: self.config.keep_alive.clone(),
        }
    }

    /// Build the `/api/generate` request body.
    pub(crate) fn build_generate_body(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> OllamaGenerateRequest {
        OllamaGenerateRequest {
            model: self.resolve_model(request.model.as_deref()),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            format: request.options.format.to_wire(),
            options: Self::convert_options(&request.options),
            stream,
            keep_alive: self.config.keep_alive.clone(),
        }
    }

    /// POST `body` as JSON and return the response if its status is a success.
    pub(crate) async fn post<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<Response> {
        tracing::debug!(url, "sending request to Ollama");
        let response = self.http_client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "Ollama returned an error status");
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }
        Ok(response)
    }

    /// Parse an error response from Ollama.
    pub(crate) fn parse_error(status: u16, body: &str) -> BackendError {
        if let Ok(error_response) = serde_json::from_str::<OllamaErrorResponse>(body) {
            return BackendError::provider("ollama", error_response.error);
        }
        BackendError::http_status(status, body.to_owned())
    }
}

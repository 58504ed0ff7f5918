//! The text-generation backend abstraction.
//!
//! [`Backend`] is the seam between prompt/response handling and transport.
//! [`Ollama`](crate::llms::Ollama) implements it over HTTP; the [`mock`]
//! module provides a scripted implementation for tests and offline demos.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BackendError, Result};
use crate::message::{Conversation, Message};
use crate::request::{GenerationOptions, Request};
use crate::stream::TextStream;

/// A chat request: a conversation plus generation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    /// Model override; the backend default is used when `None`.
    pub model: Option<String>,
    /// Conversation so far, oldest first.
    pub messages: Conversation,
    /// Generation options.
    pub options: GenerationOptions,
}

impl ChatRequest {
    /// Create a request over `messages` with default options.
    #[must_use]
    pub fn new(messages: impl Into<Conversation>) -> Self {
        Self {
            model: None,
            messages: messages.into(),
            options: GenerationOptions::default(),
        }
    }

    /// Lay out a [`Request`] as chat turns, keeping its options.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self {
            model: None,
            messages: request.to_conversation(),
            options: request.options().clone(),
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the generation options.
    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// A single-prompt completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    /// Model override; the backend default is used when `None`.
    pub model: Option<String>,
    /// Optional system prompt.
    pub system: Option<String>,
    /// The prompt.
    pub prompt: String,
    /// Generation options.
    pub options: GenerationOptions,
}

impl GenerateRequest {
    /// Create a request for `prompt` with default options.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the generation options.
    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// The same prompt as a chat request.
    #[must_use]
    pub fn to_chat(&self) -> ChatRequest {
        let messages: Conversation = self
            .system
            .iter()
            .map(Message::system)
            .chain(std::iter::once(Message::user(&self.prompt)))
            .collect();
        ChatRequest {
            model: self.model.clone(),
            messages,
            options: self.options.clone(),
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
}

impl Usage {
    /// Create a usage record.
    #[must_use]
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A complete chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// The assistant message.
    pub message: Message,
    /// Model that produced it, if reported.
    pub model: Option<String>,
    /// Why generation stopped, if reported.
    pub done_reason: Option<String>,
    /// Token usage, if reported.
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// A response carrying only assistant text.
    #[must_use]
    pub fn text_only(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            model: None,
            done_reason: None,
            usage: None,
        }
    }

    /// The response text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// A text-generation service.
///
/// Transport failures surface as [`BackendError::Unavailable`] or
/// [`BackendError::Timeout`] and are never retried by implementations.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send a chat request and wait for the complete response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Send a chat request and stream the response text.
    ///
    /// By default, this returns an error indicating streaming is not supported.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        let _ = request;
        Err(BackendError::not_supported("streaming").into())
    }

    /// Complete a single prompt. Defaults to a two-turn chat.
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let response = self.chat(&request.to_chat()).await?;
        Ok(response.message.content)
    }

    /// Complete a single prompt, streaming. Defaults to a streamed chat.
    async fn generate_stream(&self, request: &GenerateRequest) -> Result<TextStream> {
        self.chat_stream(&request.to_chat()).await
    }

    /// Get the name of this provider.
    fn provider_name(&self) -> &'static str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

/// Type alias for an Arc-wrapped Backend.
pub type SharedBackend = Arc<dyn Backend>;

//! Scripted backend for testing.
//!
//! [`ScriptedBackend`] answers requests from a queue of predefined replies and
//! records every request it receives, so tests can assert on exactly what a
//! caller sent without a running server.
//!
//! # Example
//!
//! ```rust,ignore
//! use shapecall::backend::mock::ScriptedBackend;
//!
//! let backend = ScriptedBackend::new()
//!     .reply(r#"{"get_current_weather": {"location": "Paris"}}"#)
//!     .reply("It is sunny in Paris.");
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{Backend, ChatRequest, ChatResponse};
use crate::error::{BackendError, Result};
use crate::stream::{TextStream, text_stream};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Complete response text.
    Text(String),
    /// Response text delivered as these fragments when streamed.
    Fragments(Vec<String>),
    /// A backend failure.
    Error(BackendError),
}

/// A backend that replays a script.
#[derive(Debug)]
pub struct ScriptedBackend {
    model: String,
    delay: Option<Duration>,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Create a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: "scripted-model".to_owned(),
            delay: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends a complete text reply.
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Text(text.into()))
    }

    /// Appends a reply streamed as `fragments`.
    #[must_use]
    pub fn fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Scripted::Fragments(
            fragments.into_iter().map(Into::into).collect(),
        ))
    }

    /// Appends a failure.
    #[must_use]
    pub fn fail(self, error: BackendError) -> Self {
        self.push(Scripted::Error(error))
    }

    /// Waits this long before every reply.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Create a mock backend with a custom model ID.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replies not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(self, reply: Scripted) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Records `request` and pops the next reply as its fragments.
    async fn next(&self, request: &ChatRequest) -> Result<Vec<String>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let reply = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Scripted::Text(text)) => Ok(vec![text]),
            Some(Scripted::Fragments(fragments)) => Ok(fragments),
            Some(Scripted::Error(error)) => Err(error.into()),
            None => Err(BackendError::internal("scripted backend has no replies left").into()),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let text = self.next(request).await?.concat();
        Ok(ChatResponse {
            model: Some(self.model.clone()),
            done_reason: Some("stop".to_owned()),
            ..ChatResponse::text_only(text)
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        Ok(text_stream(self.next(request).await?))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::GenerateRequest;
    use crate::message::Message;
    use crate::stream::collect_text;

    fn request(text: &str) -> ChatRequest {
        ChatRequest::new(vec![Message::user(text)])
    }

    #[tokio::test]
    async fn replies_in_order_and_records_requests() {
        let backend = ScriptedBackend::new().reply("first").reply("second");

        assert_eq!(backend.chat(&request("a")).await.unwrap().text(), "first");
        assert_eq!(backend.chat(&request("b")).await.unwrap().text(), "second");

        let seen: Vec<String> = backend
            .requests()
            .iter()
            .map(|r| r.messages.last().unwrap().content.clone())
            .collect();
        assert_eq!(seen, ["a", "b"]);
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let backend = ScriptedBackend::new();
        assert!(backend.chat(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn scripted_failure() {
        let backend = ScriptedBackend::new().fail(BackendError::unavailable("refused"));
        let err = backend.chat(&request("a")).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn scripted_failure_when_streaming() {
        let backend = ScriptedBackend::new()
            .fail(BackendError::unavailable("refused"))
            .reply("after");
        let err = backend.chat_stream(&request("a")).await.err().unwrap();
        assert!(err.is_unavailable());

        let stream = backend.chat_stream(&request("b")).await.unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), "after");
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn streams_fragments() {
        let backend = ScriptedBackend::new().fragments(["Hel", "lo, ", "world"]);
        let stream = backend.chat_stream(&request("a")).await.unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn generate_goes_through_chat() {
        let backend = ScriptedBackend::new().fragments(["a", "b"]).with_model("m");
        let text = backend
            .generate(&GenerateRequest::new("p").system("s"))
            .await
            .unwrap();
        assert_eq!(text, "ab");
        assert_eq!(backend.requests()[0].messages.len(), 2);
        assert_eq!(backend.default_model(), "m");
    }
}

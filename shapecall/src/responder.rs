//! The schema-constrained responder.
//!
//! A [`Responder`] turns a question and a declared [`Schema`] into a validated
//! JSON value by one round trip through a [`Backend`]:
//!
//! 1. [`build_prompt`](Responder::build_prompt) renders the schema into the
//!    prompt and switches the backend into JSON mode.
//! 2. [`invoke`](Responder::invoke) sends it and returns the raw text.
//! 3. [`decode`](Responder::decode) parses and validates that text.
//!
//! For tool use, [`run_tools`](Responder::run_tools) adds a fourth step that
//! dispatches every operation the model chose, and [`ToolRound::follow_up`]
//! builds the conversation for the second round.
//! [`run_function`](Responder::run_function) is the single-prompt variant: it
//! goes through `generate`, lets the model name exactly one function with its
//! arguments as name/value pairs, and dispatches that call.
//!
//! The responder holds no history and never retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use shapecall::prelude::*;
//!
//! let responder = Responder::ollama(OllamaConfig::from_env())?;
//! let schema = Schema::new()
//!     .field("city", Field::string().required())
//!     .field("latitude", Field::number().required());
//!
//! match responder.respond("Where is the capital of France?", &schema, []).await? {
//!     Ok(value) => println!("{value:#}"),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::backend::{Backend, ChatRequest, GenerateRequest, SharedBackend};
use crate::decode::{self, DecodeFailure, ParsedResult};
use crate::error::{BackendError, Result};
use crate::llms::{Ollama, OllamaConfig};
use crate::message::{Conversation, Message};
use crate::prompts;
use crate::request::{Exemplar, GenerationOptions, RawResponse, Request};
use crate::schema::{self, Schema};
use crate::stream::{TextStream, collect_text};
use crate::tool::{
    HandlerResult, ToolBox, ToolCall, tool_call_from_parameter_list, tool_calls_from_operations,
};

/// Prompts a backend for JSON matching a schema.
#[derive(Clone)]
pub struct Responder {
    backend: SharedBackend,
    model: Option<String>,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("provider", &self.backend.provider_name())
            .field("model", &self.model())
            .finish()
    }
}

impl Responder {
    /// Create a responder over `backend`.
    #[must_use]
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    /// Create a responder over a shared backend.
    #[must_use]
    pub const fn from_shared(backend: SharedBackend) -> Self {
        Self {
            backend,
            model: None,
        }
    }

    /// Create a responder talking to an Ollama server.
    ///
    /// # Errors
    ///
    /// See [`Ollama::new`].
    pub fn ollama(config: OllamaConfig) -> Result<Self> {
        Ok(Self::new(Ollama::new(config)?))
    }

    /// Overrides the backend's default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// The underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Renders `schema` as the deterministic text block embedded in prompts.
    #[must_use]
    pub fn describe_schema(schema: &Schema) -> String {
        schema::describe_schema(schema)
    }

    /// Builds the prompt asking for JSON that matches `schema`.
    ///
    /// The schema and the question each appear exactly once, in the final user
    /// turn. Exemplars become user/assistant pairs ahead of it. The request
    /// asks for JSON mode at temperature 0.
    #[must_use]
    pub fn build_prompt(
        question: &str,
        schema: &Schema,
        exemplars: impl IntoIterator<Item = Exemplar>,
    ) -> Request {
        let user = prompts::structured_user_turn(&Self::describe_schema(schema), question);
        Request::new(prompts::system_for(schema), user)
            .with_exemplars(exemplars)
            .with_options(GenerationOptions::json())
    }

    /// Sends `request` and returns the full response text.
    ///
    /// Streamed requests are collected before returning.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] or [`BackendError::Timeout`] on
    /// transport failure, or any other [`BackendError`] the backend reports.
    pub async fn invoke(&self, request: &Request) -> Result<RawResponse> {
        self.send(self.chat_request(request.to_conversation(), request.options()))
            .await
    }

    /// Like [`invoke`](Self::invoke), giving up after `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Timeout`] when the deadline elapses, otherwise
    /// what [`invoke`](Self::invoke) returns.
    pub async fn invoke_with_deadline(
        &self,
        request: &Request,
        deadline: Duration,
    ) -> Result<RawResponse> {
        tokio::time::timeout(deadline, self.invoke(request))
            .await
            .map_err(|_| {
                tracing::warn!(?deadline, "backend call exceeded its deadline");
                BackendError::deadline_elapsed(deadline)
            })?
    }

    /// Sends a caller-owned conversation, as in the second round of a tool
    /// exchange.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_history(
        &self,
        conversation: &Conversation,
        options: &GenerationOptions,
    ) -> Result<RawResponse> {
        self.send(self.chat_request(conversation.clone(), options))
            .await
    }

    /// Builds the single-prompt request asking the model to pick one of
    /// `tools` and answer with [`Schema::parameter_list_call`].
    ///
    /// The question is the prompt itself; the tool list and the answer shape
    /// go in the system text. The request asks for JSON mode at temperature 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if a tool definition cannot
    /// be serialized.
    pub fn build_function_prompt(question: &str, tools: &ToolBox) -> Result<GenerateRequest> {
        let system = prompts::parameter_list_system(&tools.definitions())?;
        Ok(GenerateRequest::new(question)
            .system(system)
            .options(GenerationOptions::json()))
    }

    /// Sends a single-prompt request through the backend's `generate` and
    /// returns the full response text.
    ///
    /// The responder's model override applies when the request names none.
    /// Streamed requests are collected before returning.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn invoke_generate(&self, request: &GenerateRequest) -> Result<RawResponse> {
        let mut request = request.clone();
        if request.model.is_none() {
            request.model.clone_from(&self.model);
        }
        tracing::debug!(
            provider = self.backend.provider_name(),
            model = request.model.as_deref().unwrap_or_else(|| self.model()),
            stream = request.options.stream,
            "generating from backend"
        );

        let text = if request.options.stream {
            collect_text(self.backend.generate_stream(&request).await?).await?
        } else {
            self.backend.generate(&request).await?
        };

        tracing::debug!(bytes = text.len(), "backend responded");
        Ok(RawResponse::new(text))
    }

    /// Sends `request` and streams the response text as it is generated.
    ///
    /// # Errors
    ///
    /// Errors that occur before the first fragment are returned here; later
    /// ones are yielded by the stream.
    pub async fn invoke_stream(&self, request: &Request) -> Result<TextStream> {
        let chat = self.chat_request(request.to_conversation(), request.options());
        tracing::debug!(
            provider = self.backend.provider_name(),
            model = self.model(),
            messages = chat.messages.len(),
            "streaming from backend"
        );
        self.backend.chat_stream(&chat).await
    }

    /// Parses and validates `raw` against `schema`. See [`decode::decode`].
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFailure`] that keeps the raw text.
    pub fn decode(raw: &RawResponse, schema: &Schema) -> ParsedResult {
        decode::decode(raw.text(), schema)
    }

    /// Builds the prompt, invokes the backend and decodes the answer.
    ///
    /// The outer `Result` carries transport failures; the inner one carries
    /// the decode outcome.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn respond(
        &self,
        question: &str,
        schema: &Schema,
        exemplars: impl IntoIterator<Item = Exemplar> + Send,
    ) -> Result<ParsedResult> {
        let request = Self::build_prompt(question, schema, exemplars);
        let raw = self.invoke(&request).await?;
        Ok(Self::decode(&raw, schema))
    }

    /// Like [`respond`](Self::respond) for a type that derives its schema
    /// with `schemars`, deserializing the validated value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) if the derived schema
    /// cannot be modelled, otherwise what [`invoke`](Self::invoke) returns.
    pub async fn respond_as<T>(&self, question: &str) -> Result<std::result::Result<T, DecodeFailure>>
    where
        T: schemars::JsonSchema + DeserializeOwned,
    {
        let schema = Schema::for_type::<T>()?;
        let request = Self::build_prompt(question, &schema, []);
        let raw = self.invoke(&request).await?;
        Ok(decode::decode_as(raw.text(), &schema))
    }

    /// Offers every tool in `tools` as an optional operation, then dispatches
    /// the operations the model chose, in name order.
    ///
    /// A response that does not decode yields a round with no calls; the
    /// failure is kept in [`ToolRound::decoded`].
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn run_tools(
        &self,
        question: &str,
        tools: &ToolBox,
        exemplars: impl IntoIterator<Item = Exemplar> + Send,
    ) -> Result<ToolRound> {
        let schema = tools.schema();
        let request = Self::build_prompt(question, &schema, exemplars);
        let response = self.invoke(&request).await?;
        let decoded = Self::decode(&response, &schema);

        let calls = decoded
            .as_ref()
            .map(tool_calls_from_operations)
            .unwrap_or_default();
        if calls.is_empty() {
            tracing::debug!("model chose no operations");
        }
        let results = tools.dispatch_all(&calls).await;

        Ok(ToolRound {
            request,
            response,
            decoded,
            calls,
            results,
        })
    }

    /// Asks the model to pick one function from `tools` for `question` and
    /// dispatches it.
    ///
    /// A name with no registered tool yields [`HandlerResult::NoHandler`],
    /// which is how a question none of the tools can answer ends up. An
    /// answer that does not decode yields a round with no call; the failure
    /// is kept in [`FunctionRound::decoded`].
    ///
    /// # Errors
    ///
    /// See [`build_function_prompt`](Self::build_function_prompt) and
    /// [`invoke`](Self::invoke).
    pub async fn run_function(&self, question: &str, tools: &ToolBox) -> Result<FunctionRound> {
        let request = Self::build_function_prompt(question, tools)?;
        let response = self.invoke_generate(&request).await?;
        let decoded = decode::decode(response.text(), &Schema::parameter_list_call());

        let call = decoded.as_ref().ok().and_then(tool_call_from_parameter_list);
        let result = match &call {
            Some(call) => Some(tools.dispatch(call).await),
            None => {
                tracing::debug!("model named no function");
                None
            }
        };

        Ok(FunctionRound {
            request,
            response,
            decoded,
            call,
            result,
        })
    }

    fn chat_request(&self, messages: Conversation, options: &GenerationOptions) -> ChatRequest {
        let request = ChatRequest::new(messages).options(options.clone());
        match &self.model {
            Some(model) => request.model(model.clone()),
            None => request,
        }
    }

    async fn send(&self, request: ChatRequest) -> Result<RawResponse> {
        tracing::debug!(
            provider = self.backend.provider_name(),
            model = self.model(),
            messages = request.messages.len(),
            stream = request.options.stream,
            "invoking backend"
        );

        let text = if request.options.stream {
            collect_text(self.backend.chat_stream(&request).await?).await?
        } else {
            self.backend.chat(&request).await?.message.content
        };

        tracing::debug!(bytes = text.len(), "backend responded");
        Ok(RawResponse::new(text))
    }
}

/// One prompt-decode-dispatch round over a [`ToolBox`].
#[derive(Debug, Clone)]
pub struct ToolRound {
    /// The prompt that was sent.
    pub request: Request,
    /// What the model answered.
    pub response: RawResponse,
    /// The answer decoded against the toolbox schema.
    pub decoded: ParsedResult,
    /// Operations the model chose.
    pub calls: Vec<ToolCall>,
    /// One result per call, in the same order.
    pub results: Vec<HandlerResult>,
}

impl ToolRound {
    /// Whether the model chose no operation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// The conversation for a second round: the first prompt, the model's
    /// answer, then one framed tool result per call.
    #[must_use]
    pub fn follow_up(&self) -> Conversation {
        self.request
            .to_conversation()
            .appended(Message::assistant(self.response.text()))
            .extended(self.results.iter().map(prompts::tool_response_turn))
    }

    /// A fresh two-turn conversation asking the model to answer `question`
    /// from the results, for models that do not understand the `tool` role.
    #[must_use]
    pub fn summary_conversation(&self, question: &str) -> Conversation {
        Conversation::new()
            .with(Message::system(prompts::ANSWER_FROM_RESULTS_SYSTEM))
            .with(Message::user(prompts::results_user_turn(
                question,
                &self.results,
            )))
    }
}

/// One single-function round over a [`ToolBox`].
#[derive(Debug, Clone)]
pub struct FunctionRound {
    /// The prompt that was sent.
    pub request: GenerateRequest,
    /// What the model answered.
    pub response: RawResponse,
    /// The answer decoded against [`Schema::parameter_list_call`].
    pub decoded: ParsedResult,
    /// The function the model named, if the answer decoded.
    pub call: Option<ToolCall>,
    /// The dispatch result for [`call`](Self::call).
    pub result: Option<HandlerResult>,
}

impl FunctionRound {
    /// Whether the named function ran successfully.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.result.as_ref().is_some_and(HandlerResult::is_handled)
    }
}

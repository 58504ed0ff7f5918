//! Request types: what is sent to the backend and what comes back.

use serde_json::Value;

use crate::message::{Conversation, Message};
use crate::schema::Schema;

/// Desired output format of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Free-form text.
    #[default]
    Text,
    /// Any syntactically valid JSON (Ollama `"format": "json"`).
    Json,
    /// JSON constrained by the given JSON Schema document.
    JsonSchema(Value),
}

impl OutputFormat {
    /// Constrains output to `schema`.
    #[must_use]
    pub fn schema(schema: &Schema) -> Self {
        Self::JsonSchema(schema.to_json_schema())
    }

    /// Value of the wire-level `format` member, if any.
    #[must_use]
    pub fn to_wire(&self) -> Option<Value> {
        match self {
            Self::Text => None,
            Self::Json => Some(Value::from("json")),
            Self::JsonSchema(schema) => Some(schema.clone()),
        }
    }
}

/// Generation parameters attached to a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Whether to stream the output.
    pub stream: bool,
    /// Desired output format.
    pub format: OutputFormat,
}

impl GenerationOptions {
    /// Plain-text options with backend defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON mode at temperature zero.
    #[must_use]
    pub fn json() -> Self {
        Self {
            temperature: Some(0.0),
            stream: false,
            format: OutputFormat::Json,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Enables or disables streaming.
    #[must_use]
    pub const fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// One few-shot exchange: a question and the ideal answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exemplar {
    /// Example question, sent as a user turn.
    pub question: String,
    /// Ideal answer, sent as an assistant turn.
    pub answer: String,
}

impl Exemplar {
    /// Create an exemplar from a question and its answer text.
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Create an exemplar whose answer is a JSON value.
    #[must_use]
    pub fn json(question: impl Into<String>, answer: &Value) -> Self {
        Self::new(question, answer.to_string())
    }
}

/// An immutable prompt: system instructions, a user question, optional
/// few-shot exemplars and generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    system: String,
    user: String,
    exemplars: Vec<Exemplar>,
    options: GenerationOptions,
}

impl Request {
    /// Create a request with default options and no exemplars.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            exemplars: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    /// Sets the few-shot exemplars.
    #[must_use]
    pub fn with_exemplars(mut self, exemplars: impl IntoIterator<Item = Exemplar>) -> Self {
        self.exemplars = exemplars.into_iter().collect();
        self
    }

    /// Sets the generation options.
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// System instructions.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// User turn.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Few-shot exemplars in order.
    #[must_use]
    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    /// Generation options.
    #[must_use]
    pub const fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Lays the request out as chat turns: system, exemplar pairs, user.
    ///
    /// An empty system prompt is omitted.
    #[must_use]
    pub fn to_conversation(&self) -> Conversation {
        let system = (!self.system.is_empty()).then(|| Message::system(&self.system));
        let exemplars = self.exemplars.iter().flat_map(|e| {
            [
                Message::user(&e.question),
                Message::assistant(&e.answer),
            ]
        });
        system
            .into_iter()
            .chain(exemplars)
            .chain(std::iter::once(Message::user(&self.user)))
            .collect()
    }
}

/// The backend's literal text output. Untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse(String);

impl RawResponse {
    /// Wrap raw output text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The text as received.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RawResponse {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl AsRef<str> for RawResponse {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//! Shapecall - schema-constrained JSON and tool calls for local LLMs
//!
//! This crate prompts a locally hosted model server (Ollama) for output that
//! matches a declared [`Schema`](schema::Schema), validates what comes back,
//! and dispatches the tool calls it describes.
//!
//! The pieces:
//! - [`schema`] declares the expected shape once, for both the prompt and the
//!   validator.
//! - [`responder`] builds prompts, invokes the backend and decodes answers.
//! - [`decode`] turns untrusted text into a validated value or a
//!   [`DecodeFailure`](decode::DecodeFailure) that keeps the raw text.
//! - [`tool`] registers handlers and dispatches decoded calls.
//! - [`llms::ollama`] talks to the Ollama HTTP API.

pub mod backend;
pub mod decode;
pub mod error;
pub mod llms;
pub mod message;
pub mod prelude;
pub mod prompts;
pub mod request;
pub mod responder;
pub mod schema;
pub mod stream;
pub mod tool;

pub use decode::decode;
pub use error::{Error, Result};
pub use responder::Responder;
pub use schema::describe_schema;
pub use tool::dispatch;

/// Builds the prompt asking for JSON that matches `schema`.
/// See [`Responder::build_prompt`].
#[must_use]
pub fn build_prompt(
    question: &str,
    schema: &schema::Schema,
    exemplars: impl IntoIterator<Item = request::Exemplar>,
) -> request::Request {
    Responder::build_prompt(question, schema, exemplars)
}

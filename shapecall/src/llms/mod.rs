//! Backend implementations.
//!
//! - [`ollama`] - Ollama local LLM server

pub mod error;
pub mod ollama;

pub use ollama::{Ollama, OllamaConfig};

//! Ollama API client implementation.
//!
//! This module provides a [`Backend`](crate::backend::Backend) for the Ollama
//! local LLM server, supporting:
//! - Chat completions over `/api/chat` (complete and streaming)
//! - Prompt completions over `/api/generate` (complete and streaming)

mod chat;
mod client;
mod config;
mod stream;
mod types;

pub use client::Ollama;
pub use config::OllamaConfig;

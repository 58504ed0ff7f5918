//! Streams generated code to stdout as it arrives.
//!
//! ```bash
//! ollama pull codellama
//! OLLAMA_MODEL=codellama cargo run --example stream_codegen
//! ```

#![allow(clippy::print_stdout)]

use std::io::{Write, stdout};

use futures::StreamExt;
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

const INSTRUCTION: &str = "Write a React page in TypeScript with React hooks for a simple \
    calculator app. It should support addition, subtraction, multiplication, and division.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let client = Ollama::from_env()?;
    let mut stream = client
        .generate_stream(&GenerateRequest::new(INSTRUCTION))
        .await?;

    while let Some(fragment) = stream.next().await {
        print!("{}", fragment?);
        stdout().flush()?;
    }
    println!();

    Ok(())
}

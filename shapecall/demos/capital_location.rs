//! Typed structured output: the schema is derived from a Rust type.
//!
//! ```bash
//! ollama pull mistral
//! OLLAMA_MODEL=mistral cargo run --example capital_location -- france
//! ```

#![allow(clippy::print_stdout)]

use schemars::JsonSchema;
use serde::Deserialize;
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

/// Where a city is.
#[derive(Debug, Deserialize, JsonSchema)]
struct Location {
    /// The name of the city
    city: String,
    /// The decimal latitude of the city
    latitude: f64,
    /// The decimal longitude of the city
    longitude: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let country = std::env::args().nth(1).unwrap_or_else(|| "france".to_owned());
    let question = format!(
        "what is the decimal latitude and decimal longitude of the capital of {country}?"
    );

    let responder = Responder::ollama(OllamaConfig::from_env())?;
    match responder.respond_as::<Location>(&question).await? {
        Ok(location) => println!("{location:#?}"),
        Err(failure) => println!("{failure}\nraw: {}", failure.raw),
    }

    Ok(())
}

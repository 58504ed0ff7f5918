//! Few-shot prompting: one worked example ahead of the real question.
//!
//! ```bash
//! ollama pull llama3
//! cargo run --example weather_fewshot
//! ```

#![allow(clippy::print_stdout)]

use serde_json::json;
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let schema = Schema::new().operation(
        "get_current_weather",
        "Get the current weather for a location",
        ObjectSchema::new()
            .field(
                "location",
                Field::string()
                    .describe("The city and state, e.g. San Francisco, CA")
                    .required(),
            )
            .field(
                "unit",
                Field::enumeration(["celsius", "fahrenheit"])
                    .describe("The unit of temperature to return"),
            ),
    );

    let exemplar = Exemplar::json(
        "what is the current weather in San Diego, CA?",
        &json!({"get_current_weather": {"location": "San Diego, CA", "unit": "celsius"}}),
    );

    let responder = Responder::ollama(OllamaConfig::from_env())?;
    let request = Responder::build_prompt(
        "what is the current weather in Oklahoma City, OK?",
        &schema,
        [exemplar],
    );
    let raw = responder.invoke(&request).await?;

    match Responder::decode(&raw, &schema) {
        Ok(value) => println!("{value:#}"),
        Err(failure) => println!("{failure}\nraw: {}", failure.raw),
    }

    Ok(())
}

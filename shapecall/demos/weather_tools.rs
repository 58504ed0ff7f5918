//! Operation-map tool calling against Ollama.
//!
//! The model picks from two weather functions by filling in an operation map;
//! the chosen operations are dispatched to local handlers with fake data.
//!
//! ```bash
//! ollama pull llama3
//! cargo run --example weather_tools
//! ```

#![allow(clippy::print_stdout)]

use serde_json::{Map, Value, json};
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

fn current_weather(args: &Map<String, Value>) -> ToolResult<Value> {
    let unit = args
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or("fahrenheit");
    Ok(json!({"temperature": 55, "unit": unit, "conditions": "clear"}))
}

fn weather_forecast(args: &Map<String, Value>) -> ToolResult<Value> {
    let days = args.get("num_days").and_then(Value::as_u64).unwrap_or(1);
    let forecast: Vec<Value> = (1..=days)
        .map(|day| json!({"day": day, "temperature": 50 + day * 3, "conditions": "partly cloudy"}))
        .collect();
    Ok(json!({"location": args.get("location"), "forecast": forecast}))
}

fn toolbox() -> ToolBox {
    let mut tools = ToolBox::new();
    tools.add_fn(
        "get_current_weather",
        "Get the current weather in a given location",
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
        current_weather,
    );
    tools.add_fn(
        "get_weather_forecast",
        "Get the weather forecast for a given location",
        ObjectSchema::new()
            .field(
                "location",
                Field::string()
                    .describe("The city and state, e.g. San Francisco, CA")
                    .required(),
            )
            .field(
                "format",
                Field::enumeration(["celsius", "fahrenheit"])
                    .describe("The temperature unit to use. Infer this from the users location.")
                    .required(),
            )
            .field(
                "num_days",
                Field::integer()
                    .describe("The number of days to forecast")
                    .required(),
            ),
        weather_forecast,
    );
    tools
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let responder = Responder::ollama(OllamaConfig::from_env())?;
    let tools = toolbox();

    for question in [
        "What is the weather like in Paris?",
        "What will the weather be like in Seattle over the next 3 days?",
        "Who is the current CEO of Tesla?",
    ] {
        println!("\n{question}");
        let round = responder.run_tools(question, &tools, []).await?;

        if let Err(failure) = &round.decoded {
            println!("could not decode the answer: {failure}\n{}", failure.raw);
            continue;
        }
        if round.is_empty() {
            println!("No functions called");
            continue;
        }
        for (call, result) in round.calls.iter().zip(&round.results) {
            println!(
                "function called: {} with params: {}",
                call.name,
                Value::Object(call.arguments.clone())
            );
            println!("  -> {}", result.to_json());
        }

        let answer = responder
            .invoke_history(
                &round.summary_conversation(question),
                &GenerationOptions::new(),
            )
            .await?;
        println!("{answer}");
    }

    Ok(())
}

//! Single-function choice over `/api/generate`.
//!
//! The model names one function and lists its arguments as name/value pairs;
//! the call is dispatched to local handlers with fake data. The question about
//! Tesla matches no function and ends up without a handler.
//!
//! ```bash
//! ollama pull llama3
//! cargo run --example simple_functions
//! ```

#![allow(clippy::print_stdout)]

use serde_json::{Map, Value, json};
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

fn weather_from_location(args: &Map<String, Value>) -> ToolResult<Value> {
    Ok(json!({"location": args.get("location"), "temperature": 14, "conditions": "drizzle"}))
}

fn weather_from_lat_lon(args: &Map<String, Value>) -> ToolResult<Value> {
    Ok(json!({
        "latitude": args.get("latitude"),
        "longitude": args.get("longitude"),
        "temperature": 21,
        "conditions": "sunny"
    }))
}

fn location_from_lat_lon(args: &Map<String, Value>) -> ToolResult<Value> {
    Ok(json!({
        "latitude": args.get("latitude"),
        "longitude": args.get("longitude"),
        "address": "Union Station, 225 S Canal St, Chicago, IL"
    }))
}

fn lat_lon() -> ObjectSchema {
    ObjectSchema::new()
        .field(
            "latitude",
            Field::string().describe("The latitude of the location").required(),
        )
        .field(
            "longitude",
            Field::string().describe("The longitude of the location").required(),
        )
}

fn toolbox() -> ToolBox {
    let mut tools = ToolBox::new();
    tools.add_fn(
        "WeatherFromLocation",
        "Get the weather for a location",
        ObjectSchema::new().field(
            "location",
            Field::string()
                .describe("The location to get the weather for")
                .required(),
        ),
        weather_from_location,
    );
    tools.add_fn(
        "WeatherFromLatLon",
        "Get the weather for a location given its latitude and longitude",
        lat_lon(),
        weather_from_lat_lon,
    );
    tools.add_fn(
        "LatLonToCity",
        "Get the address or city at a latitude and longitude",
        lat_lon(),
        location_from_lat_lon,
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
        "What is the weather in London?",
        "What is the weather at 41.881832, -87.640406?",
        "who is the current ceo of tesla?",
        "what is located at 41.881832, -87.640406?",
    ] {
        println!("\n{question}");
        let round = responder.run_function(question, &tools).await?;

        let (Some(call), Some(result)) = (&round.call, &round.result) else {
            if let Err(failure) = &round.decoded {
                println!("could not decode the answer: {failure}\n{}", failure.raw);
            }
            continue;
        };
        println!(
            "function called: {} with params: {}",
            call.name,
            Value::Object(call.arguments.clone())
        );
        match result {
            HandlerResult::NoHandler { name } => println!("  -> no function named {name}"),
            other => println!("  -> {}", other.to_json()),
        }
    }

    Ok(())
}

//! Hermes-style function calling with `<tool_call>` markers.
//!
//! The first round asks the model to call a function; the call is dispatched
//! to a local handler returning canned fundamentals, and the result goes back
//! inside `<tool_response>` markers for the final answer.
//!
//! ```bash
//! ollama pull adrienbrault/nous-hermes2pro:Q8_0
//! OLLAMA_MODEL=adrienbrault/nous-hermes2pro:Q8_0 cargo run --example stock_tool_call
//! ```

#![allow(clippy::print_stdout)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shapecall::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
struct StockFundamentals;

#[derive(Debug, Deserialize)]
struct StockArgs {
    symbol: String,
}

#[derive(Debug, Serialize)]
struct Fundamentals {
    symbol: String,
    company_name: &'static str,
    sector: &'static str,
    industry: &'static str,
    market_cap: u64,
    pe_ratio: f64,
    pb_ratio: f64,
    dividend_yield: Option<f64>,
    eps: f64,
    beta: f64,
    #[serde(rename = "52_week_high")]
    week_52_high: f64,
    #[serde(rename = "52_week_low")]
    week_52_low: f64,
}

#[async_trait]
impl Tool for StockFundamentals {
    const NAME: &'static str = "get_stock_fundamentals";
    type Args = StockArgs;
    type Output = Fundamentals;
    type Error = ToolError;

    fn description(&self) -> String {
        "get_stock_fundamentals(symbol: str) -> dict - Get fundamental data for a given stock symbol.\n\
         Args: symbol (str): The stock symbol.\n\
         Returns: dict: A dictionary containing fundamental data."
            .to_owned()
    }

    fn parameters(&self) -> ObjectSchema {
        ObjectSchema::new().field("symbol", Field::string().describe("The stock symbol").required())
    }

    async fn call(&self, args: Self::Args) -> std::result::Result<Self::Output, Self::Error> {
        if !args.symbol.eq_ignore_ascii_case("TSLA") {
            return Err(ToolError::execution(format!("no data for {}", args.symbol)));
        }
        Ok(Fundamentals {
            symbol: "TSLA".to_owned(),
            company_name: "Tesla, Inc.",
            sector: "Consumer Cyclical",
            industry: "Auto Manufacturers",
            market_cap: 611_384_164_352,
            pe_ratio: 49.604_652,
            pb_ratio: 9.762_013,
            dividend_yield: None,
            eps: 4.3,
            beta: 2.427,
            week_52_high: 299.29,
            week_52_low: 152.37,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut tools = ToolBox::new();
    tools.add(StockFundamentals);

    let responder = Responder::ollama(OllamaConfig::from_env())?;
    let system = shapecall::prompts::tool_calling_system(&tools.definitions())?;
    let first = Request::new(system, "Fetch the stock fundamentals data for Tesla (TSLA)");

    let raw = responder.invoke(&first).await?;
    let calls = match parse_tool_calls(raw.text()) {
        Ok(calls) => calls,
        Err(err) => {
            println!("model answered without a usable tool call ({err}):\n{raw}");
            return Ok(());
        }
    };

    let mut history = first.to_conversation();
    for call in &calls {
        let result = tools.dispatch(call).await;
        println!("{} -> {}", call.name, result.to_json());
        history = history
            .appended(Message::assistant(call.to_tagged()))
            .appended(shapecall::prompts::tool_response_turn(&result));
    }

    let answer = responder
        .invoke_history(&history, &GenerationOptions::new())
        .await?;
    println!("\n{answer}");

    Ok(())
}

//! Integration tests for shapecall.

#![allow(clippy::unwrap_used, clippy::panic, clippy::clone_on_ref_ptr)]

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shapecall::prelude::*;

/// Fake weather lookup used across the tests.
#[derive(Debug, Clone, Copy, Default)]
struct CurrentWeather;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: String,
    unit: Option<String>,
}

#[derive(Debug, Serialize)]
struct Weather {
    location: String,
    temperature: i64,
    unit: String,
    conditions: &'static str,
}

#[async_trait]
impl Tool for CurrentWeather {
    const NAME: &'static str = "get_current_weather";
    type Args = WeatherArgs;
    type Output = Weather;
    type Error = ToolError;

    fn description(&self) -> String {
        "Get the current weather in a given location".to_owned()
    }

    fn parameters(&self) -> ObjectSchema {
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
            )
    }

    async fn call(&self, args: Self::Args) -> std::result::Result<Self::Output, Self::Error> {
        Ok(Weather {
            location: args.location,
            temperature: 55,
            unit: args.unit.unwrap_or_else(|| "fahrenheit".to_owned()),
            conditions: "clear",
        })
    }
}

fn toolbox() -> ToolBox {
    let mut tools = ToolBox::new();
    tools.add(CurrentWeather);
    tools.add_fn(
        "get_weather_forecast",
        "Get the weather forecast for a given location",
        ObjectSchema::new()
            .field("location", Field::string().required())
            .field(
                "format",
                Field::enumeration(["celsius", "fahrenheit"]).required(),
            )
            .field(
                "num_days",
                Field::integer()
                    .describe("The number of days to forecast")
                    .required(),
            ),
        |args| {
            let days = args["num_days"].as_u64().unwrap_or_default();
            Ok(json!({"location": args["location"], "days": days, "forecast": "sunny"}))
        },
    );
    tools
}

#[test]
fn toolbox_schema_lists_every_operation_as_optional() {
    let schema = toolbox().schema();
    let doc = schema.to_json_schema();

    assert_eq!(doc["type"], "object");
    assert!(doc["properties"]["get_current_weather"].is_object());
    assert!(doc["properties"]["get_weather_forecast"].is_object());
    assert!(doc.get("required").is_none_or(|r| r.as_array().unwrap().is_empty()));
    assert_eq!(schema.operations().count(), 2);
}

#[test]
fn toolbox_schema_round_trips_through_decode() {
    let schema = toolbox().schema();
    let raw = r#"{"get_weather_forecast": {"location": "Paris", "format": "celsius", "num_days": 3}}"#;
    let value = decode(raw, &schema).unwrap();
    let calls = tool_calls_from_operations(&value);

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_weather_forecast");
    assert_eq!(calls[0].arguments["num_days"], 3);
}

#[test]
fn fractional_integer_is_rejected() {
    let schema = toolbox().schema();
    let raw = r#"{"get_weather_forecast": {"location": "Paris", "format": "celsius", "num_days": 2.5}}"#;
    let failure = decode(raw, &schema).unwrap_err();

    match failure.reason {
        DecodeReason::SchemaMismatch { path, .. } => {
            assert_eq!(path, "get_weather_forecast.num_days");
        }
        other => panic!("unexpected reason: {other:?}"),
    }
}

#[tokio::test]
async fn weather_question_two_rounds() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"{"get_current_weather": {"location": "Paris, France", "unit": "celsius"}}"#)
            .reply("It is 55 degrees and clear in Paris."),
    );
    let responder = Responder::from_shared(backend.clone());
    let tools = toolbox();

    let round = responder
        .run_tools("What is the weather like in Paris?", &tools, [])
        .await
        .unwrap();
    assert_eq!(round.results.len(), 1);
    assert_eq!(
        round.results[0].output().unwrap(),
        &json!({"location": "Paris, France", "temperature": 55, "unit": "celsius", "conditions": "clear"})
    );

    let history = round.follow_up();
    let answer = responder
        .invoke_history(&history, &GenerationOptions::new())
        .await
        .unwrap();
    assert_eq!(answer.text(), "It is 55 degrees and clear in Paris.");

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].options.format, OutputFormat::Json);
    assert_eq!(requests[1].options.format, OutputFormat::Text);
    assert_eq!(requests[1].messages, history);
    assert_eq!(backend.remaining(), 0);
}

#[tokio::test]
async fn few_shot_exemplar_is_sent_before_question() {
    let backend = Arc::new(
        ScriptedBackend::new().reply(r#"{"get_current_weather": {"location": "Oklahoma City, OK"}}"#),
    );
    let responder = Responder::from_shared(backend.clone());
    let exemplar = Exemplar::json(
        "what is the current weather in San Diego, CA?",
        &json!({"get_current_weather": {"location": "San Diego, CA", "unit": "celsius"}}),
    );

    let round = responder
        .run_tools(
            "what is the current weather in Oklahoma City, OK?",
            &toolbox(),
            [exemplar],
        )
        .await
        .unwrap();
    assert_eq!(round.calls[0].arguments["location"], "Oklahoma City, OK");

    let requests = backend.requests();
    let roles: Vec<Role> = requests[0].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
}

#[tokio::test]
async fn unknown_operation_is_not_dispatched() {
    let tools = toolbox();
    let call = ToolCall::new("book_flight", serde_json::Map::new());

    let result = dispatch(&call, &tools).await;
    assert_eq!(
        result,
        HandlerResult::NoHandler {
            name: "book_flight".to_owned()
        }
    );
}

#[tokio::test]
async fn single_function_answers_over_generate() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(
                r#"{"functionName": "get_weather_forecast", "parameters": [
                    {"parameterName": "location", "parameterValue": "London"},
                    {"parameterName": "format", "parameterValue": "celsius"},
                    {"parameterName": "num_days", "parameterValue": 2}
                ]}"#,
            )
            .reply(r#"{"functionName": "get_ceo", "parameters": []}"#),
    );
    let responder = Responder::from_shared(backend.clone());
    let tools = toolbox();

    let round = responder
        .run_function("What will the weather be in London for 2 days?", &tools)
        .await
        .unwrap();
    assert_eq!(
        round.result.unwrap().output().unwrap(),
        &json!({"location": "London", "days": 2, "forecast": "sunny"})
    );

    let round = responder
        .run_function("who is the current ceo of tesla?", &tools)
        .await
        .unwrap();
    assert_eq!(
        round.result,
        Some(HandlerResult::NoHandler {
            name: "get_ceo".to_owned()
        })
    );
    assert_eq!(backend.remaining(), 0);
}

#[tokio::test]
async fn invalid_arguments_fail_without_running() {
    let tools = toolbox();
    let call = ToolCall::new(
        "get_current_weather",
        json!({"location": "Paris", "unit": "kelvin"})
            .as_object()
            .unwrap()
            .clone(),
    );

    let result = tools.dispatch(&call).await;
    assert!(matches!(
        result,
        HandlerResult::Failed {
            error: ToolError::InvalidArguments(_),
            ..
        }
    ));
}

#[tokio::test]
async fn hermes_tool_call_exchange() {
    let tools = toolbox();
    let system = shapecall::prompts::tool_calling_system(&tools.definitions()).unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(
                "Let me check.\n<tool_call>\n{\"name\": \"get_current_weather\", \
                 \"arguments\": {\"location\": \"Boston, MA\"}}\n</tool_call>",
            )
            .reply("It is clear in Boston."),
    );
    let responder = Responder::from_shared(backend.clone());

    let first = Request::new(system, "What's the weather in Boston?");
    let raw = responder.invoke(&first).await.unwrap();
    let call = parse_tool_call(raw.text()).unwrap();
    let result = tools.dispatch(&call).await;
    assert!(result.is_handled());

    let history = first
        .to_conversation()
        .appended(Message::assistant(call.to_tagged()))
        .appended(shapecall::prompts::tool_response_turn(&result));
    let answer = responder
        .invoke_history(&history, &GenerationOptions::new())
        .await
        .unwrap();

    assert_eq!(answer.text(), "It is clear in Boston.");
    assert_eq!(first.to_conversation().len(), 2);
    assert_eq!(history.len(), 4);
    assert!(history.messages()[0].content.contains("get_weather_forecast"));
}

#[tokio::test]
async fn hermes_reply_without_markers_is_reported() {
    let err = parse_tool_call("I don't need a tool for that.").unwrap_err();
    assert!(matches!(err, ToolCallError::MarkerNotFound));

    let err = parse_tool_call("<tool_call>{\"name\": \"x\"").unwrap_err();
    assert!(matches!(err, ToolCallError::UnterminatedMarker));

    let err = parse_tool_call("<tool_call>{\"name\": \"x\"}</tool_call>").unwrap_err();
    assert!(matches!(err, ToolCallError::MalformedInnerJson(_)));
}

#[tokio::test]
async fn extraction_with_nested_arrays() {
    let event = ObjectSchema::new()
        .field("name", Field::string().required())
        .field("date", Field::string())
        .field("location", Field::string());
    let schema = Schema::new()
        .field("eventsQuantity", Field::integer().required())
        .field("events", Field::array(SchemaType::Object(event)).required());

    let responder = Responder::new(ScriptedBackend::new().reply(
        r#"{"eventsQuantity": 2, "events": [{"name": "Launch", "date": null}, {"date": "May 3"}]}"#,
    ));
    let failure = responder
        .respond("List the events.", &schema, [])
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(
        failure.reason,
        DecodeReason::MissingRequiredField("events[1].name".to_owned())
    );
}

#[tokio::test]
async fn streaming_fragments_concatenate() {
    let responder = Responder::new(
        ScriptedBackend::new().fragments(["const ", "add = ", "(a, b) => a + b;"]),
    );
    let stream = responder
        .invoke_stream(&Request::new("", "write add"))
        .await
        .unwrap();
    assert_eq!(
        collect_text(stream).await.unwrap(),
        "const add = (a, b) => a + b;"
    );
}

#[test]
fn build_prompt_is_pure() {
    let schema = Schema::new().field("city", Field::string().required());
    let a = shapecall::build_prompt("q", &schema, []);
    let b = shapecall::build_prompt("q", &schema, []);
    assert_eq!(a, b);
    assert_eq!(describe_schema(&schema), describe_schema(&schema));
    let value: Value = serde_json::from_str(&describe_schema(&schema)).unwrap();
    assert_eq!(value["required"], json!(["city"]));
}

//! Instruction texts used to build prompts.
//!
//! Two conventions are covered:
//! - schema-in-prompt JSON mode, where the model answers with one JSON value
//!   matching a rendered [`Schema`] (records or operation maps);
//! - Hermes-style function calling, where tool signatures travel inside
//!   `<tools>` markers and calls come back inside `<tool_call>` markers;
//! - single-function choice over `/api/generate`, where the model names one
//!   function and lists its arguments as name/value pairs.

use crate::decode::{TOOL_RESPONSE_TAGS, TOOLS_TAGS};
use crate::error::Result;
use crate::message::Message;
use crate::schema::Schema;
use crate::tool::{HandlerResult, ToolDefinition};

/// System instructions for extracting a record that matches a schema.
pub const STRUCTURED_OUTPUT_SYSTEM: &str = "\
You will be given a question to answer and a schema.
Extract the information requested in the question and generate output in JSON observing the schema provided.
Use the following schema exactly. Don't make up fields that aren't in the schema.
If the schema shows a type of integer, you must only show an integer for that field.
If the schema shows a type of number, you must only show a number for that field.
A string should always be a valid string.
If a value is unknown, omit the field or use null.
Output must be valid JSON.";

/// System instructions for choosing operations from an operation-map schema.
pub const OPERATION_MAP_SYSTEM: &str = "\
You will be given a question to answer and a schema.
The schema consists of a list of functions that you can use to answer the question.
If you need to use a function, provide the parameters for that function under its name.
If multiple functions are provided, you may need to use more than one to answer the question.
Leave out functions you do not need. Don't make up fields that aren't in the schema.
If the schema shows a type of integer, you must only show an integer for that field.
A string should always be a valid string.
If a value is unknown, omit the field or use null.
Output must be valid JSON.";

/// System instructions for answering from tool results.
pub const ANSWER_FROM_RESULTS_SYSTEM: &str = "\
You are a helpful assistant. Answer the user's question using the function results provided.
Do not call any more functions. Do not make up values that are not in the results.";

/// The system text matching the shape of `schema`.
///
/// A non-empty schema whose every top-level field is an object is treated as
/// an operation map.
#[must_use]
pub fn system_for(schema: &Schema) -> &'static str {
    let root = schema.root();
    if !root.is_empty() && schema.operations().count() == root.len() {
        OPERATION_MAP_SYSTEM
    } else {
        STRUCTURED_OUTPUT_SYSTEM
    }
}

/// The user turn carrying the rendered schema and the question, once each.
#[must_use]
pub fn structured_user_turn(schema_text: &str, question: &str) -> String {
    format!(
        "Only add data to the most appropriate field. \
         If there isn't a value for a field, use null. Output should be in JSON.\n\n\
         Schema:\n{schema_text}\n\nQuestion:\n{question}"
    )
}

/// System instructions for Hermes-style function calling over `tools`.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if a definition cannot be
/// serialized.
pub fn tool_calling_system(tools: &[ToolDefinition]) -> Result<String> {
    let signatures = serde_json::to_string(tools)?;
    let call_schema = Schema::function_call().to_json_schema();

    Ok(format!(
        "You are a function calling AI model. \
         You are provided with function signatures within {open}{close} XML tags.\n\
         You may call one or more functions to assist with the user query. \
         Don't make assumptions about what values to plug into functions.\n\
         Once you have called a function, results will be fed back to you within \
         {resp_open}{resp_close} XML tags.\n\
         Don't make assumptions about tool results if {resp_open} XML tags are not present, \
         since the function hasn't been executed yet.\n\
         Here are the available tools:\n\
         {tools_block}\n\
         Use the following JSON schema for each tool call you will make: {call_schema}\n\
         For each function call return a valid JSON object with function name and arguments \
         within <tool_call></tool_call> XML tags as follows:\n\
         <tool_call>\n{{\"name\": <function-name>, \"arguments\": <args-dict>}}\n</tool_call>",
        open = TOOLS_TAGS.open,
        close = TOOLS_TAGS.close,
        resp_open = TOOL_RESPONSE_TAGS.open,
        resp_close = TOOL_RESPONSE_TAGS.close,
        tools_block = TOOLS_TAGS.wrap(&signatures),
    ))
}

/// System instructions for choosing one of `tools` and answering in the
/// parameter-list shape of [`Schema::parameter_list_call`].
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if a definition cannot be
/// serialized.
pub fn parameter_list_system(tools: &[ToolDefinition]) -> Result<String> {
    let shape = serde_json::json!({
        "functionName": "function name",
        "parameters": [{"parameterName": "name of parameter", "parameterValue": "value of parameter"}]
    });
    let tools = serde_json::to_string(tools)?;

    Ok(format!(
        "You are a helpful assistant that takes a question and finds the most appropriate tool \
         to execute, along with the parameters required to run the tool.\n\
         Respond as JSON using the following schema: {shape}\n\
         If none of the tools can answer the question, name the function you would need instead.\n\
         The tools are: {tools}"
    ))
}

/// The message feeding a dispatch result back to the model, framed in
/// `<tool_response>` markers.
#[must_use]
pub fn tool_response_turn(result: &HandlerResult) -> Message {
    Message::tool(TOOL_RESPONSE_TAGS.wrap(&result.to_json().to_string()))
}

/// A user turn summarizing several dispatch results as JSON, for backends
/// that ignore the `tool` role.
#[must_use]
pub fn results_user_turn(question: &str, results: &[HandlerResult]) -> String {
    let results: Vec<_> = results.iter().map(HandlerResult::to_json).collect();
    let rendered =
        serde_json::to_string_pretty(&results).unwrap_or_else(|_| format!("{results:?}"));
    format!("Question:\n{question}\n\nFunction results:\n{rendered}")
}

//! Tools the model may call, and the registry that dispatches to them.
//!
//! A tool declares its parameters as an [`ObjectSchema`]. The same declaration
//! feeds the operation-map schema shown to the model ([`ToolBox::schema`]),
//! the Hermes-style signatures ([`ToolBox::definitions`]) and the argument
//! check performed before the tool runs.
//!
//! Dispatching a call whose name has no registered tool is not an error: it
//! yields [`HandlerResult::NoHandler`] and nothing is invoked.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::decode::TOOL_CALL_TAGS;
use crate::error::ToolError;
use crate::schema::{ObjectSchema, Schema};

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// A decoded request to run one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Operation name.
    pub name: String,
    /// Argument object.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// The call as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({"name": self.name, "arguments": self.arguments})
    }

    /// The call framed in `<tool_call>` markers, as an assistant turn would
    /// carry it.
    #[must_use]
    pub fn to_tagged(&self) -> String {
        TOOL_CALL_TAGS.wrap(&self.to_json().to_string())
    }
}

/// Converts an operation-map value into one call per entry whose value is an
/// object, in map order. `null` entries and non-object values are skipped.
#[must_use]
pub fn tool_calls_from_operations(value: &Value) -> Vec<ToolCall> {
    let Some(operations) = value.as_object() else {
        return Vec::new();
    };
    operations
        .iter()
        .filter_map(|(name, arguments)| {
            arguments
                .as_object()
                .map(|arguments| ToolCall::new(name.clone(), arguments.clone()))
        })
        .collect()
}

/// Converts a parameter-list answer into a call.
///
/// The value has the shape of [`Schema::parameter_list_call`]:
/// `{"functionName": "f", "parameters": [{"parameterName": "a", "parameterValue": 1}]}`.
/// Each entry becomes one argument; an entry without a string `parameterName`
/// is skipped, a missing `parameterValue` becomes `null`, and a repeated name
/// keeps its last value. Returns `None` when `functionName` is not a string.
#[must_use]
pub fn tool_call_from_parameter_list(value: &Value) -> Option<ToolCall> {
    let name = value.get("functionName")?.as_str()?;
    let arguments = value
        .get("parameters")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let key = entry.get("parameterName")?.as_str()?;
            let value = entry.get("parameterValue").cloned().unwrap_or(Value::Null);
            Some((key.to_owned(), value))
        })
        .collect();
    Some(ToolCall::new(name, arguments))
}

/// Signature of a tool in the Hermes function-calling format.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ToolDefinition {
    /// Name of the tool (e.g., "get_weather").
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema of the parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Serializes to `{"type": "function", "function": {...}}`.
impl Serialize for ToolDefinition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut function = Map::new();
        function.insert("name".to_owned(), Value::String(self.name.clone()));
        function.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        function.insert("parameters".to_owned(), self.parameters.clone());

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &function)?;
        map.end()
    }
}

/// A typed operation the model can request.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static name of the tool.
    const NAME: &'static str;

    /// Arguments type for the tool.
    type Args: DeserializeOwned + Send;

    /// Output type of the tool.
    type Output: Serialize + Send;

    /// Error type for tool execution.
    type Error: Into<ToolError> + Send;

    /// Get the name of the tool.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Declared parameters.
    fn parameters(&self) -> ObjectSchema;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name(),
            self.description(),
            self.parameters().to_json_schema(),
        )
    }

    /// Validate JSON arguments against [`parameters`](Self::parameters), run
    /// the tool and return its output as JSON.
    async fn call_json(&self, args: Value) -> ToolResult<Value>
    where
        Self::Output: 'static,
    {
        self.parameters()
            .validate(&args)
            .map_err(|v| ToolError::invalid_args(v.to_string()))?;
        let typed_args: Self::Args = serde_json::from_value(args)?;
        let result = self.call(typed_args).await.map_err(Into::into)?;
        serde_json::to_value(result).map_err(|e| ToolError::execution(e.to_string()))
    }
}

/// A boxed dynamic tool that can be used in collections.
pub type BoxedTool = Box<dyn DynTool>;

/// Object-safe version of the Tool trait for dynamic dispatch.
#[async_trait]
pub trait DynTool: Send + Sync {
    /// Get the name of the tool.
    fn name(&self) -> &str;

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Declared parameters.
    fn parameters(&self) -> ObjectSchema;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name(),
            self.description(),
            self.parameters().to_json_schema(),
        )
    }

    /// Call the tool with JSON arguments.
    async fn call_json(&self, args: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<T: Tool + 'static> DynTool for T
where
    T::Output: 'static,
{
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> String {
        Tool::description(self)
    }

    fn parameters(&self) -> ObjectSchema {
        Tool::parameters(self)
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_json(&self, args: Value) -> ToolResult<Value> {
        Tool::call_json(self, args).await
    }
}

/// A tool backed by a plain function over the argument object.
pub struct FnTool<F> {
    name: String,
    description: String,
    parameters: ObjectSchema,
    handler: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Map<String, Value>) -> ToolResult<Value> + Send + Sync,
{
    /// Create a function tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ObjectSchema,
        handler: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> DynTool for FnTool<F>
where
    F: Fn(&Map<String, Value>) -> ToolResult<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters(&self) -> ObjectSchema {
        self.parameters.clone()
    }

    async fn call_json(&self, args: Value) -> ToolResult<Value> {
        self.parameters
            .validate(&args)
            .map_err(|v| ToolError::invalid_args(v.to_string()))?;
        let Value::Object(arguments) = args else {
            return Err(ToolError::invalid_args("arguments must be an object"));
        };
        (self.handler)(&arguments)
    }
}

/// Outcome of dispatching one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// The handler ran and produced output.
    Handled {
        /// Operation name.
        name: String,
        /// Handler output.
        output: Value,
    },
    /// The handler ran, or was about to, and failed.
    Failed {
        /// Operation name.
        name: String,
        /// What went wrong.
        error: ToolError,
    },
    /// No handler is registered under the name; nothing ran.
    NoHandler {
        /// Operation name.
        name: String,
    },
}

impl HandlerResult {
    /// Operation name the result is for.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Handled { name, .. } | Self::Failed { name, .. } | Self::NoHandler { name } => {
                name
            }
        }
    }

    /// Whether a handler ran successfully.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    /// Handler output, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&Value> {
        match self {
            Self::Handled { output, .. } => Some(output),
            _ => None,
        }
    }

    /// The result as the JSON object sent back to the model:
    /// `{"name", "content"}` on success, `{"name", "error"}` otherwise.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Handled { name, output } => json!({"name": name, "content": output}),
            Self::Failed { name, error } => json!({"name": name, "error": error.to_string()}),
            Self::NoHandler { name } => {
                json!({"name": name, "error": format!("no handler for `{name}`")})
            }
        }
    }
}

/// A registry of tools keyed by name.
#[derive(Default)]
pub struct ToolBox {
    tools: BTreeMap<String, BoxedTool>,
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolBox {
    /// Create a new empty toolbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the toolbox, replacing any tool of the same name.
    pub fn add<T: Tool + 'static>(&mut self, tool: T)
    where
        T::Output: 'static,
    {
        self.tools.insert(Tool::name(&tool).to_owned(), Box::new(tool));
    }

    /// Add a boxed tool to the toolbox.
    pub fn add_boxed(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Add a function handler.
    pub fn add_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ObjectSchema,
        handler: F,
    ) where
        F: Fn(&Map<String, Value>) -> ToolResult<Value> + Send + Sync + 'static,
    {
        self.add_boxed(Box::new(FnTool::new(name, description, parameters, handler)));
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.get(name)
    }

    /// Check if the toolbox contains a tool with the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all tools, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Get the number of tools in the toolbox.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the toolbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool definitions, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// The operation-map schema offering every tool as an optional operation.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.tools.values().fold(Schema::new(), |schema, tool| {
            schema.operation(tool.name(), tool.description(), tool.parameters())
        })
    }

    /// Runs the tool named by `call`.
    pub async fn dispatch(&self, call: &ToolCall) -> HandlerResult {
        let name = call.name.clone();
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::debug!(tool = %name, "no handler registered");
            return HandlerResult::NoHandler { name };
        };

        tracing::debug!(tool = %name, "dispatching tool call");
        match tool.call_json(Value::Object(call.arguments.clone())).await {
            Ok(output) => HandlerResult::Handled { name, output },
            Err(error) => {
                tracing::warn!(tool = %name, %error, "tool call failed");
                HandlerResult::Failed { name, error }
            }
        }
    }

    /// Runs each call in order.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<HandlerResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(call).await);
        }
        results
    }
}

/// Runs `call` against `handlers`. See [`ToolBox::dispatch`].
pub async fn dispatch(call: &ToolCall, handlers: &ToolBox) -> HandlerResult {
    handlers.dispatch(call).await
}

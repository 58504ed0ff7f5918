//! Schema description shared by prompt rendering and response validation.
//!
//! A [`Schema`] is rendered into the prompt with [`Schema::render`] and the very
//! same value validates the model's answer with [`Schema::validate`], so what
//! the model is told and what the caller accepts cannot drift apart.
//!
//! Two shapes are expressed with the same type:
//!
//! - a *record* schema, whose properties are plain fields (structured data
//!   extraction);
//! - an *operation map*, whose properties are each an object describing one
//!   operation's parameters (simulated function calling).
//!
//! # Example
//!
//! ```rust,ignore
//! use shapecall::schema::{Field, ObjectSchema, Schema};
//!
//! let schema = Schema::new().operation(
//!     "get_current_weather",
//!     "Get the current weather in a given location",
//!     ObjectSchema::new()
//!         .field("location", Field::string().describe("The city and state").required())
//!         .field("unit", Field::enumeration(["celsius", "fahrenheit"])),
//! );
//! println!("{}", schema.render());
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Semantic type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaType {
    /// A JSON string.
    String,
    /// A JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
    /// A nested object.
    Object(ObjectSchema),
    /// An array whose items all have the given type.
    Array(Box<SchemaType>),
}

impl SchemaType {
    /// JSON Schema `type` keyword for this type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".to_owned(), Value::from(self.type_name()));
        match self {
            Self::Enum(options) => {
                out.insert("enum".to_owned(), Value::from(options.clone()));
            }
            Self::Object(object) => object.write_json(&mut out),
            Self::Array(item) => {
                out.insert("items".to_owned(), Value::Object(item.to_json()));
            }
            Self::String | Self::Integer | Self::Number | Self::Boolean => {}
        }
        out
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), Violation> {
        match (self, value) {
            (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Number, Value::Number(_)) => Ok(()),
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (Self::Enum(options), Value::String(s)) => {
                if options.iter().any(|option| option == s) {
                    Ok(())
                } else {
                    Err(Violation::NotInEnum {
                        path: path.to_owned(),
                        value: s.clone(),
                    })
                }
            }
            (Self::Object(object), Value::Object(_)) => object.validate_at(value, path),
            (Self::Array(item), Value::Array(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, v)| item.check(v, &format!("{path}[{i}]"))),
            _ => Err(Violation::WrongType {
                path: path.to_owned(),
                expected: self.type_name(),
                found: json_type(value),
            }),
        }
    }
}

impl From<ObjectSchema> for SchemaType {
    fn from(object: ObjectSchema) -> Self {
        Self::Object(object)
    }
}

/// One named parameter: a type, an optional description and a required flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    kind: SchemaType,
    description: Option<String>,
    required: bool,
}

impl Field {
    /// Creates an optional field of the given type.
    #[must_use]
    pub const fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            required: false,
        }
    }

    /// A string field.
    #[must_use]
    pub const fn string() -> Self {
        Self::new(SchemaType::String)
    }

    /// An integer field.
    #[must_use]
    pub const fn integer() -> Self {
        Self::new(SchemaType::Integer)
    }

    /// A number field.
    #[must_use]
    pub const fn number() -> Self {
        Self::new(SchemaType::Number)
    }

    /// A boolean field.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::new(SchemaType::Boolean)
    }

    /// A string field restricted to `values`.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaType::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// A nested object field.
    #[must_use]
    pub const fn object(schema: ObjectSchema) -> Self {
        Self::new(SchemaType::Object(schema))
    }

    /// An array field whose items have type `item`.
    #[must_use]
    pub fn array(item: impl Into<SchemaType>) -> Self {
        Self::new(SchemaType::Array(Box::new(item.into())))
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The field's type.
    #[must_use]
    pub const fn kind(&self) -> &SchemaType {
        &self.kind
    }

    /// The field's description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the field must be present and non-null.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    fn to_json(&self) -> Value {
        let mut out = self.kind.to_json();
        if let Some(description) = &self.description {
            out.insert("description".to_owned(), Value::from(description.as_str()));
        }
        Value::Object(out)
    }
}

impl From<SchemaType> for Field {
    fn from(kind: SchemaType) -> Self {
        Self::new(kind)
    }
}

/// Named properties of an object, in sorted key order.
///
/// A *closed* object (the default) rejects keys it does not declare. An *open*
/// object accepts any extra keys; it models free-form argument bags such as the
/// `arguments` member of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    properties: BTreeMap<String, Field>,
    open: bool,
}

impl ObjectSchema {
    /// Creates an empty closed object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object that accepts undeclared keys.
    #[must_use]
    pub fn open() -> Self {
        Self {
            properties: BTreeMap::new(),
            open: true,
        }
    }

    /// Adds or replaces a property.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.properties.insert(name.into(), field.into());
        self
    }

    /// Looks up a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.properties.get(name)
    }

    /// Iterates over properties in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of the required properties, in key order.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.fields()
            .filter(|(_, field)| field.is_required())
            .map(|(name, _)| name)
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no properties are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether undeclared keys are accepted.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Renders this object as a standalone JSON Schema document.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_owned(), Value::from("object"));
        self.write_json(&mut out);
        Value::Object(out)
    }

    fn write_json(&self, out: &mut Map<String, Value>) {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, field)| (name.clone(), field.to_json()))
            .collect();
        out.insert("properties".to_owned(), Value::Object(properties));

        let required: Vec<Value> = self.required_names().map(Value::from).collect();
        if !required.is_empty() {
            out.insert("required".to_owned(), Value::Array(required));
        }
        out.insert("additionalProperties".to_owned(), Value::Bool(self.open));
    }

    /// Checks `value` against this object alone.
    ///
    /// At each level a missing required field is reported before an unknown
    /// key, and both before the types of present fields are checked.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found, with paths relative to `value`.
    pub fn validate(&self, value: &Value) -> Result<(), Violation> {
        self.validate_at(value, "")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), Violation> {
        let Value::Object(map) = value else {
            return Err(Violation::WrongType {
                path: path.to_owned(),
                expected: "object",
                found: json_type(value),
            });
        };

        if let Some(name) = self
            .required_names()
            .find(|name| map.get(*name).is_none_or(Value::is_null))
        {
            return Err(Violation::MissingField {
                path: join(path, name),
            });
        }

        if !self.open
            && let Some(key) = map.keys().find(|k| !self.properties.contains_key(k.as_str()))
        {
            return Err(Violation::UnknownField {
                path: join(path, key),
            });
        }

        for (name, field) in &self.properties {
            if let Some(v) = map.get(name).filter(|v| !v.is_null()) {
                field.kind.check(v, &join(path, name))?;
            }
        }
        Ok(())
    }
}

/// The declared shape of a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    title: Option<String>,
    description: Option<String>,
    root: ObjectSchema,
}

impl Schema {
    /// Creates an empty record schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing object as a schema root.
    #[must_use]
    pub fn from_object(root: ObjectSchema) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// The schema a single `{"name", "arguments"}` tool call must match.
    #[must_use]
    pub fn function_call() -> Self {
        Self::new()
            .title("FunctionCall")
            .field(
                "name",
                Field::string()
                    .describe("Name of the function to call")
                    .required(),
            )
            .field(
                "arguments",
                Field::object(ObjectSchema::open())
                    .describe("Arguments to pass to the function")
                    .required(),
            )
    }

    /// The schema of a single-function answer that lists its arguments as
    /// name/value pairs:
    /// `{"functionName": .., "parameters": [{"parameterName": .., "parameterValue": ..}]}`.
    ///
    /// Parameter entries are open so `parameterValue` may hold any JSON value.
    #[must_use]
    pub fn parameter_list_call() -> Self {
        let parameter = ObjectSchema::open().field(
            "parameterName",
            Field::string().describe("name of parameter").required(),
        );
        Self::new()
            .title("ParameterListCall")
            .field(
                "functionName",
                Field::string().describe("function name").required(),
            )
            .field(
                "parameters",
                Field::array(SchemaType::Object(parameter))
                    .describe("one entry per parameter, with its parameterValue"),
            )
    }

    /// Sets the title rendered at the schema root.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description rendered at the schema root.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a top-level field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.root = self.root.field(name, field);
        self
    }

    /// Adds an optional operation whose parameters are `parameters`.
    #[must_use]
    pub fn operation(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ObjectSchema,
    ) -> Self {
        self.field(name, Field::object(parameters).describe(description))
    }

    /// The root object.
    #[must_use]
    pub const fn root(&self) -> &ObjectSchema {
        &self.root
    }

    /// Top-level properties that describe an operation (object-typed fields).
    pub fn operations(&self) -> impl Iterator<Item = (&str, &ObjectSchema)> {
        self.root.fields().filter_map(|(name, field)| match field.kind() {
            SchemaType::Object(params) => Some((name, params)),
            _ => None,
        })
    }

    /// Renders the schema as a JSON Schema document.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        if let Some(title) = &self.title {
            out.insert("title".to_owned(), Value::from(title.as_str()));
        }
        if let Some(description) = &self.description {
            out.insert("description".to_owned(), Value::from(description.as_str()));
        }
        out.insert("type".to_owned(), Value::from("object"));
        self.root.write_json(&mut out);
        Value::Object(out)
    }

    /// Renders the schema as pretty-printed JSON for embedding in a prompt.
    ///
    /// The output is deterministic: keys appear in sorted order.
    #[must_use]
    pub fn render(&self) -> String {
        let doc = self.to_json_schema();
        serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
    }

    /// Checks `value` against the schema without coercing anything.
    ///
    /// Unknown keys in closed objects are rejected, `null` counts as absent,
    /// and a value with a fractional part never satisfies an integer field.
    /// A missing required field takes precedence over an unknown key on the
    /// same object.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn validate(&self, value: &Value) -> Result<(), Violation> {
        self.root.validate_at(value, "")
    }

    /// Builds a schema from a JSON Schema document.
    ///
    /// Supports `type` (including `["T", "null"]`), `properties`, `required`,
    /// `description`, `enum`, `const`, `items`, `additionalProperties`, `$ref`
    /// into `$defs` or `definitions`, and `anyOf`/`oneOf` that are either
    /// nullable wrappers or unions of string literals. Objects that declare
    /// properties are closed unless `additionalProperties` says otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for constructs outside that subset.
    pub fn from_json_schema(doc: &Value) -> Result<Self, SchemaError> {
        let resolver = Resolver { root: doc };
        let parsed = resolver.parse_node(doc, "", 0)?;
        let SchemaType::Object(root) = parsed.kind else {
            return Err(SchemaError::NotAnObject);
        };
        Ok(Self {
            title: doc.get("title").and_then(Value::as_str).map(str::to_owned),
            description: parsed.description,
            root,
        })
    }

    /// Derives a schema from a Rust type via `schemars`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the generated document uses constructs
    /// [`from_json_schema`](Self::from_json_schema) does not model.
    pub fn for_type<T: schemars::JsonSchema>() -> Result<Self, SchemaError> {
        let generated = schemars::schema_for!(T);
        Self::from_json_schema(generated.as_value())
    }
}

/// Renders `schema` into the deterministic text block embedded in prompts.
#[must_use]
pub fn describe_schema(schema: &Schema) -> String {
    schema.render()
}

/// The first way a value failed to match a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Violation {
    /// A required field is absent or `null`.
    #[error("missing required field `{}`", shown(.path))]
    MissingField {
        /// Path of the field.
        path: String,
    },

    /// A key the schema does not declare.
    #[error("unknown field `{}`", shown(.path))]
    UnknownField {
        /// Path of the key.
        path: String,
    },

    /// A value of the wrong JSON type.
    #[error("`{}` should be {expected}, found {found}", shown(.path))]
    WrongType {
        /// Path of the value.
        path: String,
        /// Type the schema declares.
        expected: &'static str,
        /// Type found in the value.
        found: &'static str,
    },

    /// A string outside the declared enum.
    #[error("`{}` has value {value:?}, which is not one of the allowed values", shown(.path))]
    NotInEnum {
        /// Path of the value.
        path: String,
        /// Offending string.
        value: String,
    },
}

impl Violation {
    /// Path of the offending field, e.g. `events[0].name`.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::MissingField { path }
            | Self::UnknownField { path }
            | Self::WrongType { path, .. }
            | Self::NotInEnum { path, .. } => path,
        }
    }
}

fn shown(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const MAX_DEPTH: usize = 32;

struct Parsed {
    kind: SchemaType,
    description: Option<String>,
    nullable: bool,
}

struct Resolver<'a> {
    root: &'a Value,
}

impl<'a> Resolver<'a> {
    fn lookup(&self, reference: &str) -> Result<&'a Value, SchemaError> {
        let unresolved = || SchemaError::UnresolvedRef(reference.to_owned());
        let (section, name) = reference
            .strip_prefix("#/$defs/")
            .map(|name| ("$defs", name))
            .or_else(|| {
                reference
                    .strip_prefix("#/definitions/")
                    .map(|name| ("definitions", name))
            })
            .ok_or_else(unresolved)?;
        self.root
            .get(section)
            .and_then(|defs| defs.get(name))
            .ok_or_else(unresolved)
    }

    fn parse_node(&self, node: &'a Value, path: &str, depth: usize) -> Result<Parsed, SchemaError> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::unsupported(
                path,
                "schema nests too deeply or is recursive",
            ));
        }
        let Value::Object(map) = node else {
            return Err(SchemaError::unsupported(path, "expected a schema object"));
        };
        let description = map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned);

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            let mut parsed = self.parse_node(self.lookup(reference)?, path, depth + 1)?;
            if description.is_some() {
                parsed.description = description;
            }
            return Ok(parsed);
        }

        if let Some(branches) = map
            .get("anyOf")
            .or_else(|| map.get("oneOf"))
            .and_then(Value::as_array)
        {
            return self.parse_union(branches, description, path, depth);
        }

        if let Some(literals) = literal_options(node) {
            let nullable = map
                .get("enum")
                .and_then(Value::as_array)
                .is_some_and(|values| values.iter().any(Value::is_null));
            return Ok(Parsed {
                kind: SchemaType::Enum(literals),
                description,
                nullable,
            });
        }

        let (type_name, nullable) = match map.get("type") {
            None => (None, false),
            Some(Value::String(name)) => (Some(name.as_str()), false),
            Some(Value::Array(names)) => {
                let nullable = names.iter().any(|n| n.as_str() == Some("null"));
                let rest: Vec<&str> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|n| *n != "null")
                    .collect();
                match rest.as_slice() {
                    [single] => (Some(*single), nullable),
                    _ => {
                        return Err(SchemaError::unsupported(
                            path,
                            format!("type union {}", Value::Array(names.clone())),
                        ));
                    }
                }
            }
            Some(other) => {
                return Err(SchemaError::unsupported(path, format!("type {other}")));
            }
        };

        let kind = match type_name {
            Some("string") => SchemaType::String,
            Some("integer") => SchemaType::Integer,
            Some("number") => SchemaType::Number,
            Some("boolean") => SchemaType::Boolean,
            Some("object") => SchemaType::Object(self.parse_object(map, path, depth)?),
            None if map.contains_key("properties") => {
                SchemaType::Object(self.parse_object(map, path, depth)?)
            }
            Some("array") => {
                let items = map
                    .get("items")
                    .ok_or_else(|| SchemaError::unsupported(path, "array without `items`"))?;
                let item = self.parse_node(items, &format!("{path}[]"), depth + 1)?;
                SchemaType::Array(Box::new(item.kind))
            }
            Some(other) => {
                return Err(SchemaError::unsupported(path, format!("type `{other}`")));
            }
            None => return Err(SchemaError::unsupported(path, "missing `type`")),
        };

        Ok(Parsed {
            kind,
            description,
            nullable,
        })
    }

    fn parse_union(
        &self,
        branches: &'a [Value],
        description: Option<String>,
        path: &str,
        depth: usize,
    ) -> Result<Parsed, SchemaError> {
        let is_null = |b: &Value| b.get("type").and_then(Value::as_str) == Some("null");
        let nullable = branches.iter().any(is_null);
        let rest: Vec<&'a Value> = branches.iter().filter(|b| !is_null(b)).collect();

        let literals: Option<Vec<String>> = rest
            .iter()
            .map(|b| literal_options(b))
            .collect::<Option<Vec<_>>>()
            .map(|groups| groups.into_iter().flatten().collect());

        match (literals, rest.as_slice()) {
            (Some(options), [_, _, ..]) => Ok(Parsed {
                kind: SchemaType::Enum(options),
                description,
                nullable,
            }),
            (_, [single]) => {
                let mut parsed = self.parse_node(single, path, depth + 1)?;
                parsed.nullable |= nullable;
                if description.is_some() {
                    parsed.description = description;
                }
                Ok(parsed)
            }
            _ => Err(SchemaError::unsupported(
                path,
                "union of several non-literal schemas",
            )),
        }
    }

    fn parse_object(
        &self,
        map: &'a Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<ObjectSchema, SchemaError> {
        let required: Vec<&str> = map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let properties = map.get("properties").and_then(Value::as_object);
        let declares_properties = properties.is_some_and(|p| !p.is_empty());

        let open = match map.get("additionalProperties") {
            Some(Value::Bool(allowed)) => *allowed,
            Some(Value::Object(_)) => true,
            _ => !declares_properties,
        };
        let mut object = if open {
            ObjectSchema::open()
        } else {
            ObjectSchema::new()
        };

        for (name, node) in properties.into_iter().flatten() {
            let parsed = self.parse_node(node, &join(path, name), depth + 1)?;
            let mut field = Field::new(parsed.kind);
            field.description = parsed.description;
            field.required = required.contains(&name.as_str()) && !parsed.nullable;
            object = object.field(name.clone(), field);
        }
        Ok(object)
    }
}

/// String literals a node admits through `enum` or `const`, ignoring `null`.
fn literal_options(node: &Value) -> Option<Vec<String>> {
    if let Some(value) = node.get("const") {
        return value.as_str().map(|s| vec![s.to_owned()]);
    }
    let values = node.get("enum")?.as_array()?;
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.as_str().map(str::to_owned))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Schema {
        Schema::new().operation(
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
        )
    }

    mod rendering {
        use super::*;

        #[test]
        fn json_schema_shape() {
            let doc = weather_schema().to_json_schema();
            assert_eq!(doc["type"], "object");
            assert_eq!(doc["additionalProperties"], false);
            assert!(doc.get("required").is_none());

            let op = &doc["properties"]["get_current_weather"];
            assert_eq!(op["type"], "object");
            assert_eq!(
                op["description"],
                "Get the current weather in a given location"
            );
            assert_eq!(op["required"], json!(["location"]));
            assert_eq!(
                op["properties"]["unit"]["enum"],
                json!(["celsius", "fahrenheit"])
            );
            assert_eq!(op["properties"]["unit"]["type"], "string");
        }

        #[test]
        fn render_is_deterministic() {
            let a = Schema::new()
                .field("zeta", Field::integer())
                .field("alpha", Field::string());
            let b = Schema::new()
                .field("alpha", Field::string())
                .field("zeta", Field::integer());
            assert_eq!(a.render(), b.render());
            assert!(a.render().find("alpha").unwrap() < a.render().find("zeta").unwrap());
        }

        #[test]
        fn describe_schema_matches_render() {
            let schema = weather_schema();
            assert_eq!(describe_schema(&schema), schema.render());
        }

        #[test]
        fn arrays_render_item_schema() {
            let schema = Schema::new().field(
                "events",
                Field::array(ObjectSchema::new().field("name", Field::string().required())),
            );
            let doc = schema.to_json_schema();
            let items = &doc["properties"]["events"]["items"];
            assert_eq!(items["type"], "object");
            assert_eq!(items["required"], json!(["name"]));
        }

        #[test]
        fn title_and_description_at_root() {
            let doc = Schema::function_call().description("One call").to_json_schema();
            assert_eq!(doc["title"], "FunctionCall");
            assert_eq!(doc["description"], "One call");
            assert_eq!(doc["properties"]["arguments"]["additionalProperties"], true);
        }

        #[test]
        fn operations_lists_object_fields() {
            let schema = weather_schema().field("note", Field::string());
            let names: Vec<&str> = schema.operations().map(|(name, _)| name).collect();
            assert_eq!(names, ["get_current_weather"]);
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn accepts_conforming_value() {
            let value = json!({
                "get_current_weather": {"location": "San Diego, CA", "unit": "celsius"}
            });
            assert!(weather_schema().validate(&value).is_ok());
        }

        #[test]
        fn accepts_empty_operation_map() {
            assert!(weather_schema().validate(&json!({})).is_ok());
        }

        #[test]
        fn rejects_unknown_top_level_key() {
            let value = json!({"get_stock_price": {"symbol": "TSLA"}});
            assert_eq!(
                weather_schema().validate(&value),
                Err(Violation::UnknownField {
                    path: "get_stock_price".to_owned()
                })
            );
        }

        #[test]
        fn rejects_unknown_nested_key() {
            let value = json!({"get_current_weather": {"location": "Paris", "days": 3}});
            let err = weather_schema().validate(&value).unwrap_err();
            assert_eq!(err.path(), "get_current_weather.days");
        }

        #[test]
        fn reports_missing_required_field() {
            let value = json!({"get_current_weather": {"unit": "celsius"}});
            assert_eq!(
                weather_schema().validate(&value),
                Err(Violation::MissingField {
                    path: "get_current_weather.location".to_owned()
                })
            );
        }

        #[test]
        fn missing_required_field_wins_over_unknown_key() {
            let value = json!({"get_current_weather": {"unit": "celsius", "city": "Paris"}});
            assert_eq!(
                weather_schema().validate(&value),
                Err(Violation::MissingField {
                    path: "get_current_weather.location".to_owned()
                })
            );
        }

        #[test]
        fn null_counts_as_missing_for_required() {
            let value = json!({"get_current_weather": {"location": null}});
            assert!(matches!(
                weather_schema().validate(&value),
                Err(Violation::MissingField { .. })
            ));
        }

        #[test]
        fn null_is_fine_for_optional() {
            let value = json!({"get_current_weather": {"location": "Paris", "unit": null}});
            assert!(weather_schema().validate(&value).is_ok());
        }

        #[test]
        fn integer_does_not_accept_fraction() {
            let schema = Schema::new().field("count", Field::integer().required());
            assert!(schema.validate(&json!({"count": 3})).is_ok());
            assert_eq!(
                schema.validate(&json!({"count": 3.5})),
                Err(Violation::WrongType {
                    path: "count".to_owned(),
                    expected: "integer",
                    found: "number",
                })
            );
            assert!(schema.validate(&json!({"count": "3"})).is_err());
        }

        #[test]
        fn number_accepts_integers_and_fractions() {
            let schema = Schema::new().field("lat", Field::number());
            assert!(schema.validate(&json!({"lat": 48})).is_ok());
            assert!(schema.validate(&json!({"lat": 48.8566})).is_ok());
        }

        #[test]
        fn enum_rejects_other_strings() {
            let value = json!({"get_current_weather": {"location": "Paris", "unit": "kelvin"}});
            assert_eq!(
                weather_schema().validate(&value),
                Err(Violation::NotInEnum {
                    path: "get_current_weather.unit".to_owned(),
                    value: "kelvin".to_owned(),
                })
            );
        }

        #[test]
        fn array_items_report_index() {
            let schema = Schema::new().field(
                "events",
                Field::array(ObjectSchema::new().field("name", Field::string().required())),
            );
            let value = json!({"events": [{"name": "Launch"}, {"date": "today"}]});
            assert_eq!(schema.validate(&value).unwrap_err().path(), "events[1].date");

            let value = json!({"events": [{"name": "Launch"}, {}]});
            assert_eq!(
                schema.validate(&value),
                Err(Violation::MissingField {
                    path: "events[1].name".to_owned()
                })
            );
        }

        #[test]
        fn root_must_be_object() {
            let err = weather_schema().validate(&json!([1, 2])).unwrap_err();
            assert_eq!(err.path(), "");
            assert_eq!(err.to_string(), "`<root>` should be object, found array");
        }

        #[test]
        fn open_objects_accept_any_keys() {
            let value = json!({"name": "f", "arguments": {"anything": [1, 2]}});
            assert!(Schema::function_call().validate(&value).is_ok());
        }

        #[test]
        fn parameter_list_call_shape() {
            let schema = Schema::parameter_list_call();
            let value = json!({
                "functionName": "LocationFromLatLon",
                "parameters": [{"parameterName": "latitude", "parameterValue": 41.881832}]
            });
            assert!(schema.validate(&value).is_ok());
            assert!(schema.validate(&json!({"functionName": "now"})).is_ok());

            let value = json!({"functionName": "f", "parameters": [{"parameterValue": 1}]});
            assert_eq!(
                schema.validate(&value),
                Err(Violation::MissingField {
                    path: "parameters[0].parameterName".to_owned()
                })
            );
            assert_eq!(
                schema.validate(&json!({"parameters": []})),
                Err(Violation::MissingField {
                    path: "functionName".to_owned()
                })
            );
        }
    }

    mod from_json_schema {
        use super::*;

        #[test]
        fn parses_operation_map_document() {
            let doc = json!({
                "type": "object",
                "properties": {
                    "get_weather_forecast": {
                        "type": "object",
                        "description": "Get the weather forecast for a given location",
                        "properties": {
                            "location": {"type": "string"},
                            "format": {"type": "string", "enum": ["celsius", "fahrenheit"]},
                            "num_days": {"type": "number"}
                        },
                        "required": ["location", "format", "num_days"],
                        "additionalProperties": false
                    }
                },
                "additionalProperties": false
            });
            let schema = Schema::from_json_schema(&doc).unwrap();
            let (name, params) = schema.operations().next().unwrap();
            assert_eq!(name, "get_weather_forecast");
            assert_eq!(params.required_names().count(), 3);
            assert_eq!(
                params.get("format").unwrap().kind(),
                &SchemaType::Enum(vec!["celsius".to_owned(), "fahrenheit".to_owned()])
            );
        }

        #[test]
        fn round_trips_own_rendering() {
            let schema = weather_schema();
            let parsed = Schema::from_json_schema(&schema.to_json_schema()).unwrap();
            assert_eq!(parsed, schema);
        }

        #[test]
        fn resolves_refs_and_nullable_types() {
            let doc = json!({
                "title": "Forecast",
                "type": "object",
                "properties": {
                    "unit": {"anyOf": [{"$ref": "#/$defs/Unit"}, {"type": "null"}]},
                    "city": {"type": ["string", "null"]},
                    "days": {"type": "integer", "format": "uint32", "minimum": 0}
                },
                "required": ["days", "city"],
                "$defs": {
                    "Unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
                }
            });
            let schema = Schema::from_json_schema(&doc).unwrap();
            let root = schema.root();
            assert!(matches!(root.get("unit").unwrap().kind(), SchemaType::Enum(_)));
            assert!(!root.get("city").unwrap().is_required());
            assert!(root.get("days").unwrap().is_required());
            assert_eq!(schema.to_json_schema()["title"], "Forecast");
        }

        #[test]
        fn const_branches_become_enum() {
            let doc = json!({
                "type": "object",
                "properties": {
                    "unit": {"oneOf": [
                        {"type": "string", "const": "celsius", "description": "Metric"},
                        {"type": "string", "const": "fahrenheit"}
                    ]}
                }
            });
            let schema = Schema::from_json_schema(&doc).unwrap();
            assert_eq!(
                schema.root().get("unit").unwrap().kind(),
                &SchemaType::Enum(vec!["celsius".to_owned(), "fahrenheit".to_owned()])
            );
        }

        #[test]
        fn object_without_properties_is_open() {
            let doc = json!({
                "type": "object",
                "properties": {"arguments": {"type": "object"}}
            });
            let schema = Schema::from_json_schema(&doc).unwrap();
            match schema.root().get("arguments").unwrap().kind() {
                SchemaType::Object(obj) => assert!(obj.is_open()),
                other => panic!("expected object, got {other:?}"),
            }
        }

        #[test]
        fn rejects_non_object_root() {
            let doc = json!({"type": "string"});
            assert_eq!(
                Schema::from_json_schema(&doc),
                Err(SchemaError::NotAnObject)
            );
        }

        #[test]
        fn rejects_unresolved_ref() {
            let doc = json!({
                "type": "object",
                "properties": {"x": {"$ref": "#/$defs/Missing"}}
            });
            assert_eq!(
                Schema::from_json_schema(&doc),
                Err(SchemaError::UnresolvedRef("#/$defs/Missing".to_owned()))
            );
        }

        #[test]
        fn rejects_recursive_refs() {
            let doc = json!({
                "type": "object",
                "properties": {"node": {"$ref": "#/$defs/Node"}},
                "$defs": {"Node": {"$ref": "#/$defs/Node"}}
            });
            assert!(matches!(
                Schema::from_json_schema(&doc),
                Err(SchemaError::Unsupported { .. })
            ));
        }

        #[test]
        fn rejects_array_without_items() {
            let doc = json!({
                "type": "object",
                "properties": {"tags": {"type": "array"}}
            });
            assert!(Schema::from_json_schema(&doc).is_err());
        }
    }

    mod derived {
        use super::*;

        /// A city and its coordinates.
        #[allow(dead_code)]
        #[derive(schemars::JsonSchema)]
        struct Location {
            /// The name of the city
            city: String,
            /// The decimal latitude of the city
            latitude: f64,
            longitude: f64,
            country: Option<String>,
            aliases: Vec<String>,
        }

        #[test]
        fn schema_from_rust_type() {
            let schema = Schema::for_type::<Location>().unwrap();
            let root = schema.root();

            assert_eq!(root.get("city").unwrap().kind(), &SchemaType::String);
            assert_eq!(
                root.get("city").unwrap().description(),
                Some("The name of the city")
            );
            assert_eq!(root.get("latitude").unwrap().kind(), &SchemaType::Number);
            assert!(root.get("latitude").unwrap().is_required());
            assert!(!root.get("country").unwrap().is_required());
            assert_eq!(
                root.get("aliases").unwrap().kind(),
                &SchemaType::Array(Box::new(SchemaType::String))
            );

            let ok = json!({"city": "Paris", "latitude": 48.85, "longitude": 2.35, "aliases": []});
            assert!(schema.validate(&ok).is_ok());
        }
    }
}

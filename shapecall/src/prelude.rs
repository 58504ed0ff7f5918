//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types and traits for easy access.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shapecall::prelude::*;
//! ```

pub use crate::llms::{Ollama, OllamaConfig};

pub use crate::backend::mock::ScriptedBackend;
pub use crate::backend::{
    Backend, ChatRequest, ChatResponse, GenerateRequest, SharedBackend, Usage,
};
pub use crate::decode::{
    DecodeFailure, DecodeReason, ExtractError, ParsedResult, TOOL_CALL_TAGS, TagPair,
    ToolCallError, decode, decode_as, parse_tool_call, parse_tool_calls,
};
pub use crate::error::{BackendError, Error, Result, SchemaError, ToolError};
pub use crate::message::{Conversation, Message, Role};
pub use crate::request::{Exemplar, GenerationOptions, OutputFormat, RawResponse, Request};
pub use crate::responder::{FunctionRound, Responder, ToolRound};
pub use crate::schema::{Field, ObjectSchema, Schema, SchemaType, Violation, describe_schema};
pub use crate::stream::{TextStream, collect_text};
pub use crate::tool::{
    BoxedTool, DynTool, HandlerResult, Tool, ToolBox, ToolCall, ToolDefinition, ToolResult,
    dispatch, tool_call_from_parameter_list, tool_calls_from_operations,
};

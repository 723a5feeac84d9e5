//! Text toolkit capabilities exposed over the MCP protocol

pub mod resources;
pub mod text;
pub mod tools;

use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};
use serde_json::Value;

/// Builds a successful tool result with a text block and optional structured payload.
pub fn text_result(text: String, structured: Option<Value>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: structured.and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        }),
    }
}

/// Tool result flagged with `isError`; the call itself still succeeds.
pub fn soft_failure(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text.into(), None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

//! Error taxonomy shared by the dispatcher, the handlers and the JSON-RPC boundary
//!
//! Every failure that leaves the server is rendered through [`create_error_response`],
//! so the codes below are part of the wire contract.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::task::JoinError;

use crate::{config::ConfigError, mcp::transport::TransportError};

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const REQUEST_ID_RANDOM_LEN: usize = 6;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Stable machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "MCP_ERROR")]
    Mcp,
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "TOOL_EXECUTION_ERROR")]
    ToolExecution,
    #[serde(rename = "RESOURCE_ACCESS_ERROR")]
    ResourceAccess,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcp => "MCP_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::ToolExecution => "TOOL_EXECUTION_ERROR",
            Self::ResourceAccess => "RESOURCE_ACCESS_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum McpError {
    #[error("{message}")]
    Server {
        message: String,
        details: Option<Value>,
    },
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    #[error("{message}")]
    ToolExecution {
        message: String,
        tool_name: String,
        details: Option<Value>,
    },
    #[error("{message}")]
    ResourceAccess {
        message: String,
        uri: String,
        details: Option<Value>,
    },
}

impl McpError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            details: None,
        }
    }

    pub fn server_with_details(message: impl Into<String>, details: Value) -> Self {
        Self::Server {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn tool_execution(message: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolExecution {
            message: message.into(),
            tool_name: tool_name.into(),
            details: None,
        }
    }

    pub fn resource_access(message: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::ResourceAccess {
            message: message.into(),
            uri: uri.into(),
            details: None,
        }
    }

    /// Attaches extra details; tool and resource errors merge them with their own keys.
    pub fn with_details(mut self, extra: Value) -> Self {
        match &mut self {
            Self::Server { details, .. }
            | Self::Validation { details, .. }
            | Self::ToolExecution { details, .. }
            | Self::ResourceAccess { details, .. } => *details = Some(extra),
        }
        self
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Server { .. } => "McpError",
            Self::Validation { .. } => "ValidationError",
            Self::ToolExecution { .. } => "ToolExecutionError",
            Self::ResourceAccess { .. } => "ResourceAccessError",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Server { .. } => ErrorCode::Mcp,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::ToolExecution { .. } => ErrorCode::ToolExecution,
            Self::ResourceAccess { .. } => ErrorCode::ResourceAccess,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Server { .. } | Self::ToolExecution { .. } | Self::ResourceAccess { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Server { message, .. }
            | Self::Validation { message, .. }
            | Self::ToolExecution { message, .. }
            | Self::ResourceAccess { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Server { details, .. } | Self::Validation { details, .. } => details.clone(),
            Self::ToolExecution {
                tool_name, details, ..
            } => Some(merge_details("toolName", tool_name, details.as_ref())),
            Self::ResourceAccess { uri, details, .. } => {
                Some(merge_details("uri", uri, details.as_ref()))
            }
        }
    }
}

fn merge_details(key: &str, value: &str, extra: Option<&Value>) -> Value {
    let mut merged = Map::new();
    merged.insert(key.to_string(), Value::String(value.to_string()));
    match extra {
        Some(Value::Object(extra)) => {
            merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(other) => {
            merged.insert("context".to_string(), other.clone());
        }
        None => {}
    }
    Value::Object(merged)
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

/// Normalizes any error into the response envelope.
///
/// Taxonomy members keep their code, message and details. Anything else is
/// classified as `INTERNAL_ERROR` and carries its source chain as a trace.
pub fn create_error_response(
    error: &(dyn std::error::Error + 'static),
    request_id: Option<&str>,
) -> ErrorResponse {
    let timestamp = now_timestamp();

    if let Some(known) = error.downcast_ref::<McpError>() {
        return ErrorResponse {
            error: ErrorBody {
                code: known.code(),
                message: known.message().to_string(),
                status_code: known.status_code(),
                details: known.details(),
                timestamp,
            },
        };
    }

    let mut trace = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push(cause.to_string());
        source = cause.source();
    }

    ErrorResponse {
        error: ErrorBody {
            code: ErrorCode::Internal,
            message: error.to_string(),
            status_code: 500,
            details: Some(json!({
                "requestId": request_id,
                "debug": format!("{error:?}"),
                "trace": trace,
            })),
            timestamp,
        },
    }
}

/// Produces an identifier of the form `req_<unix-millis>_<base36>`.
///
/// The base36 part starts with a process-wide sequence number, so two ids from
/// the same process never collide even within one millisecond.
pub fn generate_request_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0);
    let sequence = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut rng = rand::thread_rng();
    let random: String = (0..REQUEST_ID_RANDOM_LEN)
        .map(|_| char::from(BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())]))
        .collect();

    format!("req_{millis}_{}{random}", to_base36(sequence))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Message of an error value. Taxonomy members report their bare message.
pub fn describe_error(error: &(dyn StdError + 'static)) -> String {
    match error.downcast_ref::<McpError>() {
        Some(known) => known.message().to_string(),
        None => error.to_string(),
    }
}

/// Renders a message for any error-like or panic payload value.
///
/// Pass `payload.as_ref()` for boxed values, otherwise the box itself is inspected.
pub fn error_message(value: &dyn Any) -> String {
    if let Some(error) = as_error(value) {
        return describe_error(error);
    }
    if let Some(message) = value.downcast_ref::<String>() {
        return message.clone();
    }
    if let Some(message) = value.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }

    UNKNOWN_ERROR_MESSAGE.to_string()
}

fn as_error(value: &dyn Any) -> Option<&(dyn StdError + 'static)> {
    fn cast<E: StdError + 'static>(value: &dyn Any) -> Option<&(dyn StdError + 'static)> {
        value
            .downcast_ref::<E>()
            .map(|error| error as &(dyn StdError + 'static))
    }

    cast::<McpError>(value)
        .or_else(|| cast::<ConfigError>(value))
        .or_else(|| cast::<TransportError>(value))
        .or_else(|| cast::<JoinError>(value))
        .or_else(|| cast::<std::io::Error>(value))
        .or_else(|| cast::<serde_json::Error>(value))
        .or_else(|| {
            value
                .downcast_ref::<Box<dyn StdError + Send + Sync>>()
                .map(|error| &**error as &(dyn StdError + 'static))
        })
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

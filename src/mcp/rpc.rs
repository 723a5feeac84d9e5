//! JSON-RPC envelopes and the error boundary
//!
//! This is the only place where an error becomes a wire response.

use std::error::Error;

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};

use crate::errors::create_error_response;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data: data.clone(),
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );

    serde_json::to_value(response).unwrap_or_else(|_| {
        let mut error = json!({ "code": code, "message": message });
        if let Some(data) = data {
            error["data"] = data;
        }
        json!({ "jsonrpc": "2.0", "id": id, "error": error })
    })
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        if let Ok(value) = serde_json::to_value(response) {
            return value;
        }
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

/// Renders any error through the envelope: status 400 becomes `-32602`,
/// everything else `-32603`. The envelope itself travels in `data`.
pub fn error_to_json_rpc(
    id: Option<Value>,
    error: &(dyn Error + 'static),
    request_id: &str,
) -> Value {
    let envelope = create_error_response(error, Some(request_id));
    let code = if envelope.error.status_code == 400 {
        INVALID_PARAMS
    } else {
        INTERNAL_ERROR
    };
    let data = serde_json::to_value(&envelope).ok();

    json_rpc_error_with_data(id, code, &envelope.error.message, data)
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::errors::McpError;

    #[test]
    fn validation_errors_map_to_invalid_params() {
        let error = McpError::validation("Validation failed: text: Required");
        let response = error_to_json_rpc(Some(json!(7)), &error, "req_1_a");

        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["message"], "Validation failed: text: Required");
        assert_eq!(response["error"]["data"]["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(response["error"]["data"]["error"]["statusCode"], 400);
    }

    #[test]
    fn tool_errors_map_to_internal_error_with_details() {
        let error = McpError::tool_execution("boom", "count_words");
        let response = error_to_json_rpc(Some(json!("abc")), &error, "req_1_a");

        assert_eq!(response["id"], "abc");
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert_eq!(
            response["error"]["data"]["error"]["details"]["toolName"],
            "count_words"
        );
    }

    #[test]
    fn foreign_errors_are_internal_and_carry_request_id() {
        let error = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let response = error_to_json_rpc(Some(json!(1)), &error, "req_9_z");

        let body = &response["error"]["data"]["error"];
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "disk on fire");
        assert_eq!(body["details"]["requestId"], "req_9_z");
    }

    #[test]
    fn errors_without_id_serialize_null_id() {
        let response = json_rpc_error(None, PARSE_ERROR, "Parse error");

        assert_eq!(response["jsonrpc"], "2.0");
        assert!(response["id"].is_null());
        assert_eq!(response["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn results_keep_request_id() {
        let response = json_rpc_result(Some(json!(3)), json!({ "tools": [] }));

        assert_eq!(response["id"], 3);
        assert_eq!(response["result"]["tools"], json!([]));
    }
}

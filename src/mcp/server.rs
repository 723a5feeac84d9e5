//! JSON-RPC method routing
//!
//! Decodes one message, creates its [`RequestContext`], routes the method to the
//! dispatcher and renders the outcome. Every handled request is audited with
//! sensitive params redacted.

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, JsonrpcMessage, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    errors::McpError,
    logging::request_span,
    mcp::{
        context::RequestContext,
        dispatcher::Dispatcher,
        rpc::{
            error_to_json_rpc, json_rpc_error, json_rpc_result, INVALID_REQUEST, METHOD_NOT_FOUND,
        },
    },
};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

pub async fn handle_json_rpc_value(dispatcher: &Dispatcher, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"));
            }

            Some(
                handle_json_rpc_request(
                    dispatcher,
                    request_id,
                    &request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            debug!(method = %notification.method, "notification received");
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
        }
    }
}

pub async fn handle_json_rpc_request(
    dispatcher: &Dispatcher,
    id: Option<Value>,
    method: &str,
    params: Option<Value>,
) -> Value {
    let context = RequestContext::new();
    let request_id = context.request_id.clone();
    let audit_params = redact_audit_params(params.as_ref());

    let response = match method {
        "initialize" => render(
            id,
            negotiate_protocol_version(params.as_ref()).map(initialize_result),
            &request_id,
        ),
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => {
            let _span = request_span(&context.for_listing()).entered();
            render(id, dispatcher.list_tools(), &request_id)
        }
        "tools/call" => render(id, dispatcher.call_tool(params, context).await, &request_id),
        "resources/list" => {
            let _span = request_span(&context.for_listing()).entered();
            render(id, dispatcher.list_resources(), &request_id)
        }
        "resources/read" => render(
            id,
            dispatcher.read_resource(params, context).await,
            &request_id,
        ),
        _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    info!(
        request_id = %request_id,
        method = %method,
        params = %audit_params,
        outcome = if response.get("error").is_some() { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

fn render<T: Serialize>(id: Option<Value>, outcome: Result<T, McpError>, request_id: &str) -> Value {
    let encoded = outcome.and_then(|result| {
        serde_json::to_value(result)
            .map_err(|err| McpError::server(format!("failed to encode result: {err}")))
    });

    match encoded {
        Ok(value) => json_rpc_result(id, value),
        Err(err) => error_to_json_rpc(id, &err, request_id),
    }
}

fn initialize_result(protocol_version: ProtocolVersion) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: None,
            ..Default::default()
        },
        protocol_version: protocol_version.into(),
        instructions: None,
        meta: None,
    }
}

/// Requires an offered version and answers with the one this server speaks.
/// Clients offering a newer revision decide for themselves whether to proceed.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<ProtocolVersion, McpError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| McpError::validation("initialize params.protocolVersion is required"))?;

    if offered_version != SUPPORTED_PROTOCOL_VERSION {
        debug!(
            offered = %offered_version,
            supported = SUPPORTED_PROTOCOL_VERSION,
            "client offered a different protocol version"
        );
    }

    Ok(ProtocolVersion::V2024_11_05)
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        Value::String(text) if text.chars().count() > AUDIT_TEXT_LIMIT => Value::String(format!(
            "{}... ({} chars)",
            text.chars().take(AUDIT_TEXT_LIMIT).collect::<String>(),
            text.chars().count()
        )),
        _ => value.clone(),
    }
}

/// Longer strings are truncated in audit lines; tool inputs can be large documents.
const AUDIT_TEXT_LIMIT: usize = 200;

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "private_key"
    ) || ["token", "secret", "password", "credential"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{config::Config, mcp::rpc::INVALID_PARAMS, AppState};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(AppState::new(Arc::new(Config::default())))
    }

    async fn call(payload: Value) -> Value {
        handle_json_rpc_value(&dispatcher(), payload)
            .await
            .expect("request produces a response")
    }

    #[tokio::test]
    async fn initialize_advertises_tools_and_resources() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "clientInfo": { "name": "test-client", "version": "1.0.0" },
                "capabilities": {}
            }
        }))
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert!(response["result"]["capabilities"]["tools"].is_object());
        assert!(response["result"]["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn initialize_without_version_is_invalid_params() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {}
        }))
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn ping_returns_empty_result() {
        let response = call(json!({ "jsonrpc": "2.0", "id": "p", "method": "ping" })).await;

        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn tools_list_projects_registered_tools() {
        let response = call(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" })).await;

        let tools = response["result"]["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "count_words");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn tools_call_returns_content() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "transform_case", "arguments": { "text": "a b", "mode": "kebab" } }
        }))
        .await;

        assert_eq!(response["result"]["content"][0]["text"], "a-b");
    }

    #[tokio::test]
    async fn tools_call_without_name_is_invalid_params() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": { "arguments": {} }
        }))
        .await;

        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            response["error"]["data"]["error"]["details"]["errors"][0]["field"],
            "name"
        );
        assert!(response["error"]["message"]
            .as_str()
            .expect("message")
            .starts_with("Validation failed: name: "));
    }

    #[tokio::test]
    async fn unknown_tool_is_internal_error() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "nope" }
        }))
        .await;

        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["message"], "Tool not found: nope");
        assert_eq!(response["error"]["data"]["error"]["code"], "MCP_ERROR");
    }

    #[tokio::test]
    async fn resources_read_returns_contents() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "resources/read",
            "params": { "uri": "status://server" }
        }))
        .await;

        assert_eq!(response["result"]["contents"][0]["uri"], "status://server");
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = call(json!({ "jsonrpc": "2.0", "id": 7, "method": "prompts/list" })).await;

        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let response = handle_json_rpc_value(
            &dispatcher(),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        )
        .await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn non_object_payload_is_invalid_request() {
        let response = call(json!([1, 2, 3])).await;

        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert!(response["id"].is_null());
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "count_words",
            "arguments": {
                "text": "short",
                "api_key": "should-not-appear",
                "nested": { "clientSecret": "should-not-appear" }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("count_words"));
        assert_eq!(redacted["arguments"]["text"], json!("short"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["nested"]["clientSecret"], json!("[REDACTED]"));
    }

    #[test]
    fn truncates_long_strings_in_audit_params() {
        let params = json!({ "text": "x".repeat(500) });

        let redacted = redact_audit_params(Some(&params));

        let text = redacted["text"].as_str().expect("string");
        assert!(text.ends_with("... (500 chars)"));
        assert!(text.len() < 500);
    }

    #[test]
    fn negotiation_answers_with_supported_version() {
        let params = json!({ "protocolVersion": "2026-01-01" });

        let version = negotiate_protocol_version(Some(&params)).expect("version negotiated");
        assert_eq!(version, ProtocolVersion::V2024_11_05);

        let error = negotiate_protocol_version(None).expect_err("missing version");
        assert_eq!(error.status_code(), 400);
    }
}

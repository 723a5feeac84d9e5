//! Request dispatch pipeline
//!
//! Every call moves through `received → validated → executed → responded`, or
//! stops at `failed`. Hard failures are returned as [`McpError`] for the
//! JSON-RPC boundary to render; handler-reported soft failures (`isError`)
//! are successful dispatches.

use std::sync::Arc;

use rust_mcp_sdk::schema::{CallToolResult, ListResourcesResult, ListToolsResult, ReadResourceResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::task::JoinError;
use tracing::{debug, error, warn, Instrument, Span};

use crate::{
    domain::{resources::setup_resources, tools::setup_tools},
    errors::{error_message, McpError},
    logging::request_span,
    mcp::{
        context::{AccessType, RequestContext},
        registry::{Registry, ResourceDeclaration, ToolDeclaration},
    },
    validation::validate,
    AppState,
};

pub type ToolCatalog = Arc<dyn Fn() -> Vec<ToolDeclaration> + Send + Sync>;
pub type ResourceCatalog = Arc<dyn Fn() -> Vec<ResourceDeclaration> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Executed,
    Responded,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Executed => "executed",
            Self::Responded => "responded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

fn call_tool_params_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "minLength": 1, "description": "Tool name" },
            "arguments": { "type": "object", "description": "Tool arguments" }
        },
        "required": ["name"]
    })
}

fn read_resource_params_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "uri": { "type": "string", "minLength": 1, "description": "Resource URI" }
        },
        "required": ["uri"]
    })
}

#[derive(Clone)]
pub struct Dispatcher {
    tools: ToolCatalog,
    resources: ResourceCatalog,
}

impl Dispatcher {
    pub fn new(state: AppState) -> Self {
        let tools: ToolCatalog = Arc::new(setup_tools);
        let resources: ResourceCatalog = Arc::new(move || setup_resources(&state));
        Self::with_catalogs(tools, resources)
    }

    pub fn with_catalogs(tools: ToolCatalog, resources: ResourceCatalog) -> Self {
        Self { tools, resources }
    }

    fn tool_registry(&self) -> Result<Registry<ToolDeclaration>, McpError> {
        Registry::build((self.tools)())
    }

    fn resource_registry(&self) -> Result<Registry<ResourceDeclaration>, McpError> {
        Registry::build((self.resources)())
    }

    pub fn list_tools(&self) -> Result<ListToolsResult, McpError> {
        let tools = self
            .tool_registry()?
            .iter()
            .map(ToolDeclaration::to_tool)
            .collect();

        Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools,
        })
    }

    pub fn list_resources(&self) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .resource_registry()?
            .iter()
            .map(ResourceDeclaration::to_resource)
            .collect();

        Ok(ListResourcesResult {
            meta: None,
            next_cursor: None,
            resources,
        })
    }

    pub async fn call_tool(
        &self,
        params: Option<Value>,
        context: RequestContext,
    ) -> Result<CallToolResult, McpError> {
        let span = request_span(&context);
        self.call_tool_inner(params, context).instrument(span).await
    }

    async fn call_tool_inner(
        &self,
        params: Option<Value>,
        context: RequestContext,
    ) -> Result<CallToolResult, McpError> {
        debug!(stage = Stage::Received.as_str(), "tools/call");

        let request: CallToolParams = validate(
            &call_tool_params_schema(),
            &params.unwrap_or(Value::Null),
        )?
        .into_result()
        .inspect_err(|err| {
            warn!(stage = Stage::Failed.as_str(), error = %err, "tools/call params rejected")
        })?;
        debug!(stage = Stage::Validated.as_str(), tool = %request.name);

        let registry = self.tool_registry()?;
        let Some(tool) = registry.find(&request.name) else {
            warn!(stage = Stage::Failed.as_str(), tool = %request.name, "tool not found");
            return Err(McpError::server_with_details(
                format!("Tool not found: {}", request.name),
                json!({ "toolName": request.name }),
            ));
        };

        let arguments = Value::Object(request.arguments.unwrap_or_default());
        let invocation = (tool.handler.as_ref())(arguments, context);
        let outcome = tokio::spawn(invocation.instrument(Span::current())).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!(
                    stage = Stage::Failed.as_str(),
                    tool = %request.name,
                    code = err.code().as_str(),
                    error = %err,
                    "tool handler failed"
                );
                return Err(err);
            }
            Err(join_error) => {
                let message = join_failure_message(join_error);
                error!(
                    stage = Stage::Failed.as_str(),
                    tool = %request.name,
                    error = %message,
                    "tool handler panicked"
                );
                return Err(McpError::tool_execution(message, request.name));
            }
        };
        debug!(stage = Stage::Executed.as_str(), tool = %request.name);

        if result.is_error == Some(true) {
            warn!(tool = %request.name, "tool reported a soft failure");
        }
        debug!(stage = Stage::Responded.as_str(), tool = %request.name);

        Ok(result)
    }

    pub async fn read_resource(
        &self,
        params: Option<Value>,
        context: RequestContext,
    ) -> Result<ReadResourceResult, McpError> {
        let span = request_span(&context);
        self.read_resource_inner(params, context).instrument(span).await
    }

    async fn read_resource_inner(
        &self,
        params: Option<Value>,
        context: RequestContext,
    ) -> Result<ReadResourceResult, McpError> {
        debug!(stage = Stage::Received.as_str(), "resources/read");

        let request: ReadResourceParams = validate(
            &read_resource_params_schema(),
            &params.unwrap_or(Value::Null),
        )?
        .into_result()
        .inspect_err(|err| {
            warn!(stage = Stage::Failed.as_str(), error = %err, "resources/read params rejected")
        })?;
        debug!(stage = Stage::Validated.as_str(), uri = %request.uri);

        let registry = self.resource_registry()?;
        let Some(resource) = registry.find(&request.uri) else {
            warn!(stage = Stage::Failed.as_str(), uri = %request.uri, "resource not found");
            return Err(McpError::server_with_details(
                format!("Resource not found: {}", request.uri),
                json!({ "uri": request.uri }),
            ));
        };

        let context = context.for_resource(request.uri.clone(), AccessType::Read);
        Span::current()
            .record("resource_path", request.uri.as_str())
            .record("access_type", AccessType::Read.as_str());
        let invocation = (resource.handler.as_ref())(context);
        let outcome = tokio::spawn(invocation.instrument(Span::current())).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!(
                    stage = Stage::Failed.as_str(),
                    uri = %request.uri,
                    code = err.code().as_str(),
                    error = %err,
                    "resource handler failed"
                );
                return Err(err);
            }
            Err(join_error) => {
                let message = join_failure_message(join_error);
                error!(
                    stage = Stage::Failed.as_str(),
                    uri = %request.uri,
                    error = %message,
                    "resource handler panicked"
                );
                return Err(McpError::resource_access(message, request.uri));
            }
        };
        debug!(stage = Stage::Executed.as_str(), uri = %request.uri);
        debug!(stage = Stage::Responded.as_str(), uri = %request.uri);

        Ok(result)
    }
}

fn join_failure_message(join_error: JoinError) -> String {
    if join_error.is_panic() {
        let payload = join_error.into_panic();
        error_message(payload.as_ref())
    } else {
        "handler task was cancelled".to_string()
    }
}

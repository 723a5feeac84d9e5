//! Model Context Protocol resource providers
//!
//! Static server snapshots under `config://`, `status://` and `docs://`, plus
//! one `file://` resource per configured document under the resource root.

use std::{fmt::Write as _, path::PathBuf};

use rust_mcp_sdk::schema::{ReadResourceContent, ReadResourceResult, TextResourceContents};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    domain::tools::setup_tools,
    errors::{now_timestamp, McpError},
    mcp::{context::RequestContext, registry::ResourceDeclaration},
    validation::validate_file_path,
    AppState,
};

pub const CONFIG_RESOURCE_URI: &str = "config://server";
pub const STATUS_RESOURCE_URI: &str = "status://server";
pub const TOOL_DOCS_RESOURCE_URI: &str = "docs://tools";
pub const FILE_URI_PREFIX: &str = "file://";

pub fn setup_resources(state: &AppState) -> Vec<ResourceDeclaration> {
    let mut resources = vec![
        config_resource(state),
        status_resource(state),
        ResourceDeclaration::new(
            TOOL_DOCS_RESOURCE_URI,
            "Tool Reference",
            "Markdown reference for every registered tool",
            "text/markdown",
            |_context: RequestContext| async {
                Ok(text_contents(
                    TOOL_DOCS_RESOURCE_URI,
                    "text/markdown",
                    render_tool_docs(),
                ))
            },
        ),
    ];

    resources.extend(
        state
            .config
            .resource_files
            .iter()
            .map(|relative| file_resource(state.config.resource_root.clone(), relative)),
    );
    resources
}

fn config_resource(state: &AppState) -> ResourceDeclaration {
    let config = state.config.clone();
    ResourceDeclaration::new(
        CONFIG_RESOURCE_URI,
        "Server Configuration",
        "Active server configuration",
        "application/json",
        move |_context: RequestContext| {
            let config = config.clone();
            async move {
                let value = serde_json::to_value(&*config).map_err(|err| {
                    McpError::resource_access(
                        format!("failed to encode configuration: {err}"),
                        CONFIG_RESOURCE_URI,
                    )
                })?;
                json_contents(CONFIG_RESOURCE_URI, &value)
            }
        },
    )
}

fn status_resource(state: &AppState) -> ResourceDeclaration {
    let state = state.clone();
    ResourceDeclaration::new(
        STATUS_RESOURCE_URI,
        "Server Status",
        "Version, environment and uptime of this server",
        "application/json",
        move |_context: RequestContext| {
            let state = state.clone();
            async move {
                let status = json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                    "environment": state.config.environment.as_str(),
                    "uptimeSeconds": state.uptime_seconds(),
                    "timestamp": now_timestamp(),
                });
                json_contents(STATUS_RESOURCE_URI, &status)
            }
        },
    )
}

fn file_resource(root: PathBuf, relative: &str) -> ResourceDeclaration {
    let uri = format!("{FILE_URI_PREFIX}{relative}");
    let mime_type = mime_type_for(relative);
    let relative = relative.to_string();
    let handler_uri = uri.clone();

    ResourceDeclaration::new(
        uri,
        relative.clone(),
        format!("Document {relative} from the resource root"),
        mime_type,
        move |context: RequestContext| {
            let root = root.clone();
            let relative = relative.clone();
            let uri = handler_uri.clone();
            async move {
                let cleaned = validate_file_path(&relative)?;
                let path = root.join(&cleaned);
                debug!(
                    request_id = %context.request_id,
                    path = %path.display(),
                    "reading resource file"
                );

                let text = tokio::fs::read_to_string(&path).await.map_err(|err| {
                    McpError::resource_access(format!("Failed to read {cleaned}: {err}"), &uri)
                        .with_details(json!({ "path": cleaned, "kind": format!("{:?}", err.kind()) }))
                })?;
                Ok(text_contents(&uri, mime_type, text))
            }
        },
    )
}

fn mime_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, extension)| extension.to_ascii_lowercase()) {
        Some(extension) if extension == "md" || extension == "markdown" => "text/markdown",
        Some(extension) if extension == "json" => "application/json",
        _ => "text/plain",
    }
}

fn render_tool_docs() -> String {
    let mut docs = String::from("# Tools\n");
    for declaration in setup_tools() {
        let tool = declaration.to_tool();
        let schema = serde_json::to_string_pretty(&tool.input_schema)
            .unwrap_or_else(|_| "{}".to_string());
        let _ = write!(
            docs,
            "\n## {}\n\n{}\n\n```json\n{}\n```\n",
            tool.name,
            tool.description.unwrap_or_default(),
            schema
        );
    }
    docs
}

fn json_contents(uri: &str, value: &Value) -> Result<ReadResourceResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        McpError::resource_access(format!("failed to encode resource: {err}"), uri)
    })?;
    Ok(text_contents(uri, "application/json", text))
}

fn text_contents(uri: &str, mime_type: &str, text: String) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some(mime_type.to_string()),
            text,
            uri: uri.to_string(),
        })],
        meta: None,
    }
}

//! Capability declarations and the registries built from them
//!
//! Registries are plain values: built from the collaborator setup functions on
//! every listing or dispatch and dropped afterwards.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use rust_mcp_sdk::schema::{CallToolResult, ReadResourceResult, Resource, Tool};
use serde_json::Value;

use crate::{errors::McpError, mcp::context::RequestContext};

pub type HandlerFuture<T> = Pin<Box<dyn Future<Output = Result<T, McpError>> + Send + 'static>>;

pub type ToolHandler =
    Arc<dyn Fn(Value, RequestContext) -> HandlerFuture<CallToolResult> + Send + Sync>;

pub type ResourceHandler =
    Arc<dyn Fn(RequestContext) -> HandlerFuture<ReadResourceResult> + Send + Sync>;

/// Anything stored in a [`Registry`] is looked up by a unique key.
pub trait Capability {
    fn key(&self) -> &str;
}

/// A tool's public description paired with its handler.
#[derive(Clone)]
pub struct ToolDeclaration {
    pub tool: Tool,
    pub handler: ToolHandler,
}

impl ToolDeclaration {
    pub fn new<F, Fut>(tool: Tool, handler: F) -> Self
    where
        F: Fn(Value, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, McpError>> + Send + 'static,
    {
        Self {
            tool,
            handler: Arc::new(
                move |arguments: Value, context: RequestContext| -> HandlerFuture<CallToolResult> {
                    Box::pin(handler(arguments, context))
                },
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// Public projection used by `tools/list`; the handler is never exposed.
    pub fn to_tool(&self) -> Tool {
        self.tool.clone()
    }
}

impl fmt::Debug for ToolDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDeclaration")
            .field("name", &self.tool.name)
            .field("description", &self.tool.description)
            .finish_non_exhaustive()
    }
}

impl Capability for ToolDeclaration {
    fn key(&self) -> &str {
        self.name()
    }
}

#[derive(Clone)]
pub struct ResourceDeclaration {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub handler: ResourceHandler,
}

impl ResourceDeclaration {
    pub fn new<F, Fut>(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ReadResourceResult, McpError>> + Send + 'static,
    {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
            handler: Arc::new(
                move |context: RequestContext| -> HandlerFuture<ReadResourceResult> {
                    Box::pin(handler(context))
                },
            ),
        }
    }

    pub fn to_resource(&self) -> Resource {
        Resource {
            annotations: None,
            description: Some(self.description.clone()),
            icons: vec![],
            meta: None,
            mime_type: Some(self.mime_type.clone()),
            name: self.name.clone(),
            size: None,
            title: None,
            uri: self.uri.clone(),
        }
    }
}

impl fmt::Debug for ResourceDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDeclaration")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Capability for ResourceDeclaration {
    fn key(&self) -> &str {
        &self.uri
    }
}

/// Ordered, immutable collection of declarations with unique keys.
#[derive(Debug)]
pub struct Registry<D> {
    entries: Vec<D>,
}

impl<D: Capability> Registry<D> {
    pub fn build(entries: Vec<D>) -> Result<Self, McpError> {
        for (index, entry) in entries.iter().enumerate() {
            if entries[..index]
                .iter()
                .any(|earlier| earlier.key() == entry.key())
            {
                return Err(McpError::server(format!(
                    "duplicate capability registered: {}",
                    entry.key()
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn find(&self, key: &str) -> Option<&D> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &D> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

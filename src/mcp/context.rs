//! Per-request correlation data

use serde::Serialize;

use crate::errors::{generate_request_id, now_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Read,
    List,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::List => "list",
        }
    }
}

/// Identity of one in-flight request. Each request owns its own instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: generate_request_id(),
            timestamp: now_timestamp(),
            resource_path: None,
            access_type: None,
        }
    }

    /// Same request, scoped to one resource access.
    pub fn for_resource(self, resource_path: impl Into<String>, access_type: AccessType) -> Self {
        Self {
            resource_path: Some(resource_path.into()),
            access_type: Some(access_type),
            ..self
        }
    }

    /// Same request, scoped to a listing.
    pub fn for_listing(self) -> Self {
        Self {
            access_type: Some(AccessType::List),
            ..self
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn new_contexts_are_distinct() {
        let first = RequestContext::new();
        let second = RequestContext::new();

        assert_ne!(first.request_id, second.request_id);
        assert!(DateTime::parse_from_rfc3339(&first.timestamp).is_ok());
        assert!(first.resource_path.is_none());
    }

    #[test]
    fn resource_context_serializes_camel_case() {
        let base = RequestContext::new();
        let request_id = base.request_id.clone();
        let context = base.for_resource("config://server", AccessType::Read);
        let value = serde_json::to_value(&context).expect("serialize context");

        assert_eq!(value["resourcePath"], "config://server");
        assert_eq!(value["accessType"], "read");
        assert_eq!(value["requestId"], request_id);
        assert!(request_id.starts_with("req_"));
    }
}

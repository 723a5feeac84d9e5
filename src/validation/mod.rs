//! Validation engine
//!
//! Input is checked against a JSON Schema with `jsonschema` and, when clean,
//! deserialized into the caller's type. [`validate`] never fails for bad input:
//! violations come back as an ordered [`ValidationResult::Failure`]. Only a
//! schema the engine cannot compile, or data that does not fit its declared
//! type, escalates as an error.

pub mod sanitize;

use jsonschema::{error::ValidationErrorKind, Draft, ValidationError, Validator};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::errors::McpError;

pub use sanitize::{sanitize_string, validate_file_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    Success { data: T },
    Failure { errors: Vec<FieldError> },
}

impl<T> ValidationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Success { .. } => &[],
            Self::Failure { errors } => errors,
        }
    }

    /// Converts a failure into a `VALIDATION_ERROR` listing every field error.
    pub fn into_result(self) -> Result<T, McpError> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { errors } => Err(McpError::validation_with_details(
                summarize(&errors),
                json!({ "errors": errors }),
            )),
        }
    }
}

pub fn summarize(errors: &[FieldError]) -> String {
    let parts = errors
        .iter()
        .map(|error| {
            if error.field.is_empty() {
                error.message.clone()
            } else {
                format!("{}: {}", error.field, error.message)
            }
        })
        .collect::<Vec<_>>();

    format!("Validation failed: {}", parts.join("; "))
}

/// Validates `input` against `schema` and deserializes the narrowed value into `T`.
///
/// Optional members sent as `null` are treated as absent, and integral floats
/// in `integer` positions are narrowed to integers before validation.
pub fn validate<T: DeserializeOwned>(
    schema: &Value,
    input: &Value,
) -> Result<ValidationResult<T>, McpError> {
    let validator = compile_schema(schema)?;
    let narrowed = narrow(schema, input);

    let errors = validator
        .iter_errors(&narrowed)
        .map(|error| field_error(&error))
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        return Ok(ValidationResult::Failure { errors });
    }

    let data = serde_json::from_value(narrowed).map_err(|err| {
        McpError::server(format!(
            "validated input does not match its declared type: {err}"
        ))
    })?;
    Ok(ValidationResult::Success { data })
}

fn compile_schema(schema: &Value) -> Result<Validator, McpError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| McpError::server(format!("invalid schema: {err}")))
}

fn field_error(error: &ValidationError<'_>) -> FieldError {
    let mut field = field_path(&error.instance_path.to_string());
    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(name) = property.as_str() {
            if !field.is_empty() {
                field.push('.');
            }
            field.push_str(name);
        }
    }

    FieldError {
        field,
        message: error.to_string(),
    }
}

/// Renders a JSON pointer as a dot/bracket path: `/options/items/2` becomes
/// `options.items[2]`.
fn field_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }
    path
}

fn narrow(schema: &Value, value: &Value) -> Value {
    match value {
        Value::Object(object) => match schema.get("properties").and_then(Value::as_object) {
            Some(properties) => narrow_object(schema, properties, object),
            None => value.clone(),
        },
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) => Value::Array(
                items
                    .iter()
                    .map(|item| narrow(item_schema, item))
                    .collect(),
            ),
            None => value.clone(),
        },
        Value::Number(number) if declares_integer(schema) => {
            integral(number).map_or_else(|| value.clone(), Value::Number)
        }
        _ => value.clone(),
    }
}

fn narrow_object(
    schema: &Value,
    properties: &Map<String, Value>,
    object: &Map<String, Value>,
) -> Value {
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let narrowed = object
        .iter()
        .filter(|(key, item)| {
            !item.is_null() || required.iter().any(|name| name.as_str() == Some(key.as_str()))
        })
        .map(|(key, item)| {
            let item = match properties.get(key) {
                Some(property) => narrow(property, item),
                None => item.clone(),
            };
            (key.clone(), item)
        })
        .collect();
    Value::Object(narrowed)
}

fn declares_integer(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(kind)) => kind == "integer",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind == "integer"),
        _ => false,
    }
}

fn integral(number: &Number) -> Option<Number> {
    if !number.is_f64() {
        return None;
    }
    let value = number.as_f64()?;
    if value.fract() != 0.0 {
        return None;
    }

    if value >= 0.0 && value <= u64::MAX as f64 {
        Some(Number::from(value as u64))
    } else if value < 0.0 && value >= i64::MIN as f64 {
        Some(Number::from(value as i64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use rust_mcp_sdk::macros;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, macros::JsonSchema)]
    struct Request {
        #[json_schema(min_length = 1, max_length = 10)]
        text: String,
        tags: Option<Vec<String>>,
        #[json_schema(minimum = 1)]
        depth: Option<u64>,
    }

    fn request_schema() -> Value {
        Value::Object(Request::json_schema())
    }

    #[test]
    fn accepts_valid_input_and_drops_unknown_keys() {
        let result: ValidationResult<Request> =
            validate(&request_schema(), &json!({ "text": "hello", "extra": true }))
                .expect("schema compiles");

        assert!(result.is_success());
        assert_eq!(
            result,
            ValidationResult::Success {
                data: Request {
                    text: "hello".to_string(),
                    tags: None,
                    depth: None,
                }
            }
        );
    }

    #[test]
    fn reports_one_entry_per_violation_with_paths() {
        let result: ValidationResult<Request> = validate(
            &request_schema(),
            &json!({ "text": "", "tags": ["ok", 3], "depth": 0 }),
        )
        .expect("schema compiles");

        let mut fields = result
            .errors()
            .iter()
            .map(|error| error.field.as_str())
            .collect::<Vec<_>>();
        fields.sort_unstable();
        assert_eq!(fields, vec!["depth", "tags[1]", "text"]);

        let text_error = result
            .errors()
            .iter()
            .find(|error| error.field == "text")
            .expect("text error");
        assert!(text_error.message.contains("shorter than"));
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let result: ValidationResult<Request> =
            validate(&request_schema(), &json!({})).expect("schema compiles");

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].field, "text");
        assert!(result.errors()[0].message.contains("required"));
    }

    #[test]
    fn non_object_input_fails_at_the_root() {
        let result: ValidationResult<Request> =
            validate(&request_schema(), &json!("just text")).expect("schema compiles");

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].field, "");
    }

    #[test]
    fn null_optional_members_count_as_absent() {
        let result: ValidationResult<Request> = validate(
            &request_schema(),
            &json!({ "text": "hi", "tags": null, "depth": null }),
        )
        .expect("schema compiles");

        assert!(result.is_success());
    }

    #[test]
    fn integral_floats_narrow_to_integers() {
        let result: ValidationResult<Request> =
            validate(&request_schema(), &json!({ "text": "hi", "depth": 2.0 }))
                .expect("schema compiles");

        assert_eq!(
            result,
            ValidationResult::Success {
                data: Request {
                    text: "hi".to_string(),
                    tags: None,
                    depth: Some(2),
                }
            }
        );

        let result: ValidationResult<Request> =
            validate(&request_schema(), &json!({ "text": "hi", "depth": 2.5 }))
                .expect("schema compiles");
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].field, "depth");
    }

    #[test]
    fn field_paths_use_dots_and_brackets() {
        assert_eq!(field_path(""), "");
        assert_eq!(field_path("/options/items/2"), "options.items[2]");
        assert_eq!(field_path("/a~1b/c~0d"), "a/b.c~d");
    }

    #[test]
    fn malformed_schema_escalates() {
        let schema = json!({ "type": "string", "minLength": "three" });
        let error = validate::<String>(&schema, &json!("x")).expect_err("broken schema");
        assert_eq!(error.code().as_str(), "MCP_ERROR");
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn type_mismatch_after_validation_escalates() {
        let error = validate::<u8>(&json!({}), &json!("not a number")).expect_err("type mismatch");
        assert_eq!(error.code().as_str(), "MCP_ERROR");
    }

    #[test]
    fn failure_converts_to_validation_error() {
        let result: ValidationResult<Value> = ValidationResult::Failure {
            errors: vec![
                FieldError {
                    field: "name".to_string(),
                    message: "\"name\" is a required property".to_string(),
                },
                FieldError {
                    field: String::new(),
                    message: "\"x\" is not of type \"object\"".to_string(),
                },
            ],
        };

        let error = result.into_result().expect_err("failure");
        assert_eq!(error.status_code(), 400);
        assert_eq!(
            error.message(),
            "Validation failed: name: \"name\" is a required property; \"x\" is not of type \"object\""
        );
        assert_eq!(error.details().expect("details")["errors"][0]["field"], "name");
    }
}

//! Interactive tools exposed via Model Context Protocol
//!
//! Each handler validates its own arguments against the schema it advertises,
//! so a direct invocation is held to the same contract as `tools/list` shows.

use rust_mcp_sdk::{macros, schema::CallToolResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    domain::{
        soft_failure,
        text::{analyze_sentiment, count_text, transform_case, CaseMode},
        text_result,
    },
    errors::McpError,
    mcp::{context::RequestContext, registry::ToolDeclaration},
    validation::{sanitize_string, validate},
};

pub const MAX_TEXT_LENGTH: usize = 100_000;

#[macros::mcp_tool(
    name = "count_words",
    description = "Count characters, words, sentences, paragraphs and lines in a text"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CountWordsTool {
    /// Text to analyze
    #[json_schema(min_length = 1, max_length = 100000)]
    pub text: String,
}

#[macros::mcp_tool(
    name = "transform_case",
    description = "Convert text to upper, lower, title, sentence, camel, snake or kebab case"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct TransformCaseTool {
    /// Text to transform
    #[json_schema(min_length = 1, max_length = 100000)]
    pub text: String,
    /// Target case style
    pub mode: CaseMode,
}

#[macros::mcp_tool(
    name = "analyze_sentiment",
    description = "Score the sentiment of a text using positive and negative keywords"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AnalyzeSentimentTool {
    /// Text to score
    #[json_schema(min_length = 1, max_length = 100000)]
    pub text: String,
}

pub fn setup_tools() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration::new(CountWordsTool::tool(), count_words),
        ToolDeclaration::new(TransformCaseTool::tool(), transform_case_tool),
        ToolDeclaration::new(AnalyzeSentimentTool::tool(), analyze_sentiment_tool),
    ]
}

/// Holds a direct invocation to the same schema `tools/list` advertises.
fn parse_arguments<T: DeserializeOwned>(
    schema: Map<String, Value>,
    arguments: &Value,
) -> Result<T, McpError> {
    validate(&Value::Object(schema), arguments)?.into_result()
}

async fn count_words(arguments: Value, context: RequestContext) -> Result<CallToolResult, McpError> {
    let args: CountWordsTool = parse_arguments(CountWordsTool::json_schema(), &arguments)?;
    debug!(request_id = %context.request_id, length = args.text.len(), "counting text");

    let stats = count_text(&args.text);
    let summary = format!(
        "{} words, {} sentences, {} paragraphs, {} characters",
        stats.words, stats.sentences, stats.paragraphs, stats.characters
    );

    Ok(text_result(
        summary,
        Some(structured(&CountWordsTool::tool_name(), &stats)?),
    ))
}

async fn transform_case_tool(
    arguments: Value,
    context: RequestContext,
) -> Result<CallToolResult, McpError> {
    let args: TransformCaseTool = parse_arguments(TransformCaseTool::json_schema(), &arguments)?;
    debug!(request_id = %context.request_id, mode = ?args.mode, "transforming case");

    let transformed = transform_case(&args.text, args.mode);
    let payload = json!({
        "mode": args.mode,
        "result": transformed,
        "originalLength": args.text.chars().count(),
    });

    Ok(text_result(transformed, Some(payload)))
}

async fn analyze_sentiment_tool(
    arguments: Value,
    context: RequestContext,
) -> Result<CallToolResult, McpError> {
    let args: AnalyzeSentimentTool =
        parse_arguments(AnalyzeSentimentTool::json_schema(), &arguments)?;

    let cleaned = sanitize_string(&args.text);
    let sentiment = analyze_sentiment(&cleaned);
    if sentiment.word_count == 0 {
        debug!(request_id = %context.request_id, "nothing left to score after sanitizing");
        return Ok(soft_failure(
            "No analyzable words remain after removing unsafe characters",
        ));
    }

    let summary = format!(
        "Sentiment is {} (score {}, {} words)",
        sentiment.label.as_str(),
        sentiment.score,
        sentiment.word_count
    );

    Ok(text_result(
        summary,
        Some(structured(&AnalyzeSentimentTool::tool_name(), &sentiment)?),
    ))
}

fn structured<T: Serialize>(tool_name: &str, value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|err| {
        McpError::tool_execution(format!("failed to encode tool output: {err}"), tool_name)
    })
}

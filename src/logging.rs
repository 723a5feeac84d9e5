use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::LogLevel, mcp::context::RequestContext};

/// Installs the global subscriber. Output goes to stderr; stdout carries the protocol.
pub fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Span scoping every log line of one request to its correlation id.
pub fn request_span(context: &RequestContext) -> Span {
    info_span!(
        "request",
        request_id = %context.request_id,
        resource_path = context.resource_path.as_deref(),
        access_type = context.access_type.map(|access| access.as_str()),
    )
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "health request summary"
    );

    if status.is_server_error() {
        warn!(method = %method, path = %path, "health endpoint failure");
    }

    response
}

//! Axum handlers for the health check server

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;

use crate::{errors::now_timestamp, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: now_timestamp(),
    })
}

/// Adds `Access-Control-Allow-Origin` when the request origin is configured.
pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = next.run(request).await;

    let Some(origin) = origin else {
        return response;
    };
    let origins = &state.config.cors_origins;
    let allowed = if origins.iter().any(|allowed| allowed == "*") {
        Some(HeaderValue::from_static("*"))
    } else if origin
        .to_str()
        .is_ok_and(|value| origins.iter().any(|allowed| allowed == value))
    {
        Some(origin)
    } else {
        None
    };

    if let Some(value) = allowed {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    response
}

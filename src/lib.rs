use std::{sync::Arc, time::Instant};

use axum::{middleware, routing::get, Router};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod mcp;
pub mod validation;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http::handlers::cors_middleware,
        ))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

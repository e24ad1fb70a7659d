#![forbid(unsafe_code)]

//! HTTP facade over the progress service.

mod assets;
mod error;
mod handlers;
mod middleware;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use services::ProgressService;

pub use error::ApiError;

/// Default request body cap (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `*` or a comma-separated list of allowed origins.
    pub cors_origin: String,
    pub max_body_bytes: usize,
    /// Directory holding the browser client; `None` disables static serving.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origin: "*".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            static_dir: None,
        }
    }
}

#[derive(Clone)]
pub struct WebState {
    pub progress: Arc<ProgressService>,
    pub config: Arc<WebConfig>,
}

impl WebState {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>, config: WebConfig) -> Self {
        Self {
            progress,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route(
            "/progress",
            get(handlers::get_progress).post(handlers::post_progress),
        )
        .fallback(assets::static_fallback)
        .layer(from_fn_with_state(state.clone(), middleware::cors_middleware))
        .layer(from_fn(middleware::trace_requests))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}

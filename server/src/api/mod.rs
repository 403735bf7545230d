//! API Router and Application State
//!
//! Every action is served at `/{action}`. Requests pass through
//! normalization, then the access-token gate, then dispatch.

pub mod actions;
pub mod error;
pub mod middleware;
pub mod request;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::any, Router,
};
use tower_http::trace::TraceLayer;

use crate::{backend::Backend, config::Config, ratelimit::RateLimit};

pub use actions::{ActionTable, handle_action};
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Bot session all actions are executed against
    pub backend: Arc<dyn Backend>,
    /// Server configuration
    pub config: Arc<Config>,
    /// Immutable action name lookup
    pub actions: Arc<ActionTable>,
    /// Dispatch rate limiter (optional)
    pub rate_limiter: Option<Arc<dyn RateLimit>>,
}

impl AppState {
    /// Create new application state with the full action table.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        config: Config,
        rate_limiter: Option<Arc<dyn RateLimit>>,
    ) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            actions: Arc::new(ActionTable::new()),
            rate_limiter,
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .route("/{action}", any(handle_action))
        .fallback(fallback)
        .layer(from_fn_with_state(state.clone(), middleware::require_token))
        .layer(from_fn_with_state(state.clone(), middleware::normalize_request))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback() -> ApiError {
    ApiError::NotFound
}

//! HTTP router

use crate::{AppState, boundary, middleware};
use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router.
///
/// There are no axum routes: every request goes to the failure boundary,
/// which owns dispatch.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .fallback(boundary::serve)
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    if state.config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

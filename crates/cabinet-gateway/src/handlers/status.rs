//! Service status (post-install)

use crate::controller::{Controller, RouteMap, handler};
use axum::response::IntoResponse;
use cabinet_core::WebResult;
use serde_json::json;

pub struct StatusController {
    path: String,
}

impl StatusController {
    pub fn new(api_prefix: &str) -> Self {
        Self {
            path: format!("{api_prefix}/status"),
        }
    }
}

impl Controller for StatusController {
    fn name(&self) -> &str {
        "status"
    }

    /// GET {prefix}/status - liveness and version
    fn register_routes(&self) -> RouteMap {
        RouteMap::from([(
            self.path.clone(),
            handler(|_request| async {
                Ok(WebResult::ok(json!({
                    "service": "cabinet",
                    "version": env!("CARGO_PKG_VERSION"),
                }))
                .into_response())
            }),
        )])
    }
}

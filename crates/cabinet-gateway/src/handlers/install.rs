//! Install controller (pre-install routes)

use crate::controller::{Controller, RouteMap, handler};
use crate::state::InstallState;
use axum::response::IntoResponse;
use cabinet_core::{ApiError, ResultCode, WebResult};
use serde_json::json;
use tracing::info;

/// Owns the routes reachable before installation completes
pub struct InstallController {
    prefix: String,
    install_state: InstallState,
}

impl InstallController {
    /// `api_prefix` is the gateway's API prefix, e.g. `/api`
    pub fn new(api_prefix: &str, install_state: InstallState) -> Self {
        Self {
            prefix: format!("{api_prefix}/install"),
            install_state,
        }
    }
}

impl Controller for InstallController {
    fn name(&self) -> &str {
        "install"
    }

    fn register_routes(&self) -> RouteMap {
        let mut routes = RouteMap::new();

        // GET {prefix}/status - report the install flag
        let state = self.install_state.clone();
        routes.insert(
            format!("{}/status", self.prefix),
            handler(move |_request| {
                let installed = state.is_installed();
                async move { Ok(WebResult::ok(json!({ "installed": installed })).into_response()) }
            }),
        );

        // POST {prefix}/finish - complete installation
        let state = self.install_state.clone();
        routes.insert(
            format!("{}/finish", self.prefix),
            handler(move |_request| {
                let state = state.clone();
                async move {
                    if !state.mark_installed() {
                        return Err(ApiError::custom(
                            ResultCode::BadRequest,
                            "installation already completed",
                        ));
                    }
                    info!("Installation completed");
                    Ok(WebResult::ok(json!({ "installed": true })).into_response())
                }
            }),
        );

        routes
    }
}

//! Per-request dispatch
//!
//! # Data Flow
//! ```text
//! path outside API prefix ──▶ static files
//! path under API prefix
//!     not installed ──▶ pre-install table ──▶ NOT_INSTALLED
//!     installed ──▶ session guard
//!               ──▶ post-install table
//!               ──▶ controller claims, in registration order
//!               ──▶ NOT_FOUND
//! ```

use crate::auth::SessionGuard;
use crate::controller::ControllerRegistry;
use crate::route_table::RouteTable;
use crate::state::InstallState;
use crate::static_files::StaticFiles;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request, header},
    response::Response,
};
use cabinet_core::{ApiError, ResultCode};
use std::sync::Arc;
use tracing::debug;

/// Which side of the gateway a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Api,
    Static,
}

pub struct Dispatcher {
    api_prefix: String,
    routes: Arc<RouteTable>,
    controllers: Arc<ControllerRegistry>,
    install_state: InstallState,
    session_guard: Arc<dyn SessionGuard>,
    static_files: StaticFiles,
}

impl Dispatcher {
    pub fn new(
        api_prefix: String,
        routes: Arc<RouteTable>,
        controllers: Arc<ControllerRegistry>,
        install_state: InstallState,
        session_guard: Arc<dyn SessionGuard>,
        static_files: StaticFiles,
    ) -> Self {
        Self {
            api_prefix,
            routes,
            controllers,
            install_state,
            session_guard,
            static_files,
        }
    }

    /// The prefix itself and anything below it are API paths
    pub fn classify(&self, path: &str) -> RequestKind {
        match path.strip_prefix(self.api_prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => RequestKind::Api,
            _ => RequestKind::Static,
        }
    }

    pub fn install_state(&self) -> &InstallState {
        &self.install_state
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Result<Response, ApiError> {
        let path = request.uri().path().to_string();
        match self.classify(&path) {
            RequestKind::Static => self.static_files.serve(&path).await,
            RequestKind::Api if self.install_state.is_installed() => {
                self.dispatch_installed(path, request).await
            }
            RequestKind::Api => self.dispatch_uninstalled(&path, request).await,
        }
    }

    async fn dispatch_uninstalled(
        &self,
        path: &str,
        request: Request<Body>,
    ) -> Result<Response, ApiError> {
        match self.routes.pre_install(path) {
            Some(route) => route(request).await,
            None => Err(ApiError::code(ResultCode::NotInstalled)),
        }
    }

    async fn dispatch_installed(
        &self,
        path: String,
        mut request: Request<Body>,
    ) -> Result<Response, ApiError> {
        self.session_guard.pre_handle(&mut request).await?;

        if let Some(route) = self.routes.post_install(&path) {
            return route(request).await;
        }

        if let Some((controller, route)) = self.controllers.claim(&request) {
            debug!(path = %path, controller, "Route claimed by controller");
            return route(request).await;
        }

        Err(ApiError::custom(
            ResultCode::NotFound,
            format!("no handler found for {path}"),
        ))
    }
}

/// Anti-caching defaults for API responses. Headers the handler already
/// set are left alone.
pub fn apply_no_cache(headers: &mut HeaderMap) {
    headers
        .entry(header::PRAGMA)
        .or_insert(HeaderValue::from_static("no-cache"));
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-cache"));
    headers
        .entry(header::EXPIRES)
        .or_insert(HeaderValue::from_static("0"));
}

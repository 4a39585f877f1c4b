//! Session pre-handling
//!
//! Session validation itself lives with the user controller; the gateway only
//! guarantees the guard runs before every installed-mode API call.

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use cabinet_core::ApiError;

/// Session attached to the request by a [`SessionGuard`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// User ID, `None` for anonymous visitors
    pub user_id: Option<String>,
    /// Display name
    pub display_name: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            display_name: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Runs before dispatch of every API call once the application is installed
#[async_trait]
pub trait SessionGuard: Send + Sync {
    /// Inspect the request, attach session data, or reject it
    async fn pre_handle(&self, request: &mut Request<Body>) -> Result<(), ApiError>;
}

/// Guard that lets every request through as an anonymous session
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughGuard;

#[async_trait]
impl SessionGuard for PassThroughGuard {
    async fn pre_handle(&self, request: &mut Request<Body>) -> Result<(), ApiError> {
        if request.extensions().get::<Session>().is_none() {
            request.extensions_mut().insert(Session::anonymous());
        }
        Ok(())
    }
}

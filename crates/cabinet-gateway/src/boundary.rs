//! Failure boundary
//!
//! The single axum handler behind every path. It times the request, runs the
//! dispatcher, turns any failure into the JSON envelope, and queues exactly
//! one audit record, whatever happened.

use crate::audit::RequestMeta;
use crate::dispatcher::{RequestKind, apply_no_cache};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};
use cabinet_core::ApiError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Entry point for every request
pub async fn serve(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let meta = RequestMeta::capture(&request);
    let kind = state.dispatcher.classify(&meta.path);

    let outcome = AssertUnwindSafe(state.dispatcher.dispatch(request))
        .catch_unwind()
        .await;

    let (mut response, succeeded) = match outcome {
        Ok(Ok(response)) => (response, true),
        Ok(Err(err)) => (render_failure(err, &meta), false),
        Err(panic) => {
            error!(
                method = %meta.method,
                path = %meta.path,
                panic = panic_message(panic.as_ref()),
                "Handler panicked"
            );
            (render_failure(ApiError::unrecognized(), &meta), false)
        }
    };

    if kind == RequestKind::Api {
        apply_no_cache(response.headers_mut());
    }

    state.audit.record(meta, started.elapsed(), succeeded);
    response
}

/// Log the failure at its origin and render the envelope
pub fn render_failure(err: ApiError, meta: &RequestMeta) -> Response {
    let location = err.location();
    let origin = format!("{}:{}", location.file(), location.line());
    let result = err.into_web_result();
    let status = result.status_code();

    if status.is_server_error() {
        error!(
            method = %meta.method,
            path = %meta.path,
            origin = %origin,
            code = result.code.as_str(),
            status = status.as_u16(),
            msg = %result.msg,
            "Request failed"
        );
    } else {
        warn!(
            method = %meta.method,
            path = %meta.path,
            origin = %origin,
            code = result.code.as_str(),
            status = status.as_u16(),
            msg = %result.msg,
            "Request rejected"
        );
    }

    result.into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

//! # Cabinet Core
//!
//! Shared vocabulary between the Cabinet gateway and the controllers it hosts.
//!
//! This crate provides:
//! - **Result codes**: the error taxonomy and its fixed HTTP status mapping
//! - **Response envelope**: the `{code, msg, data}` JSON body used for every API reply
//! - **Failures**: the closed set of ways a handler can fail, plus the call site
//!   that raised it
//!
//! ## Failure flow
//!
//! ```text
//! handler / guard / static server
//!         │  Err(ApiError { failure, location })
//!         ▼
//! ┌───────────────────────────────┐
//! │        failure boundary       │
//! │  Failure ──▶ WebResult ──▶ JSON │
//! └───────────────────────────────┘
//! ```

pub mod error;
pub mod result;

pub use error::{ApiError, Failure, Result};
pub use result::{JSON_CONTENT_TYPE, ResultCode, WebResult};

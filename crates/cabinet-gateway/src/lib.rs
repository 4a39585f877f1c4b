//! # Cabinet Gateway
//!
//! Single HTTP entry point of the Cabinet self-hosted file storage server.
//!
//! This crate provides:
//! - **Dispatch**: API calls routed through an immutable, phase-split route
//!   table and an ordered controller fallback chain
//! - **Static assets**: the web bundle, with single-page-app fallback
//! - **Failure boundary**: every failure, panics included, rendered as a JSON
//!   envelope with a fixed status
//! - **Audit**: one record per request, persisted off the response path
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │     Request ID │ Trace │ Body limit │ CORS          │
//! ├─────────────────────────────────────────────────────┤
//! │                 Failure Boundary ─────────▶ Audit   │
//! ├─────────────────────────────────────────────────────┤
//! │                    Dispatcher                       │
//! │   Route Table │ Controller fallback │ Static files  │
//! ├─────────────────────────────────────────────────────┤
//! │                   cabinet-core                      │
//! │        (ResultCode, WebResult, ApiError)            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod auth;
pub mod boundary;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod handlers;
pub mod middleware;
pub mod route_table;
pub mod routes;
pub mod server;
pub mod state;
pub mod static_files;

pub use audit::{AuditRecord, AuditRecorder, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use auth::{PassThroughGuard, Session, SessionGuard};
pub use config::{ConfigError, GatewayConfig};
pub use controller::{Controller, ControllerRegistry, Handler, RouteMap, handler};
pub use server::{default_collaborators, run_server, run_server_with_shutdown};
pub use state::{AppState, Collaborators, InstallState};

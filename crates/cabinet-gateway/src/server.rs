//! Server startup and lifecycle

use crate::audit::{AuditRecorder, AuditSink, TracingAuditSink};
use crate::auth::PassThroughGuard;
use crate::controller::ControllerRegistry;
use crate::handlers::{InstallController, StatusController};
use crate::state::{Collaborators, InstallState};
use crate::{AppState, GatewayConfig, routes};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long shutdown waits for queued audit records
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire the built-in collaborators: install and status controllers, the
/// pass-through session guard, and an audit worker feeding `sink`.
pub fn default_collaborators(
    config: &GatewayConfig,
    sink: Arc<dyn AuditSink>,
) -> (Collaborators, JoinHandle<()>) {
    let install_state = InstallState::new(config.installed);

    let controllers = ControllerRegistry::new(Arc::new(InstallController::new(
        &config.api_prefix,
        install_state.clone(),
    )))
    .register(Arc::new(StatusController::new(&config.api_prefix)));

    let (audit, audit_worker) = AuditRecorder::spawn_with_limit(
        sink,
        config.audit_queue_capacity,
        config.audit_handoff_limit,
    );

    let collaborators = Collaborators {
        controllers,
        session_guard: Arc::new(PassThroughGuard),
        audit,
        install_state,
    };
    (collaborators, audit_worker)
}

/// Run the gateway until Ctrl+C
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(config, shutdown_signal()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (collaborators, audit_worker) =
        default_collaborators(&config, Arc::new(TracingAuditSink));
    let state = Arc::new(AppState::new(config.clone(), collaborators)?);
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!(
        address = %listener.local_addr()?,
        api_prefix = %config.api_prefix,
        static_root = %config.static_root.display(),
        installed = config.installed,
        "Cabinet gateway listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    // The router is gone, so every recorder clone is about to drop.
    match tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, audit_worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Audit worker ended abnormally"),
        Err(_) => warn!("Audit queue not drained before shutdown"),
    }

    info!("Gateway shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

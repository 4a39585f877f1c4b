//! Application state

use crate::audit::AuditRecorder;
use crate::auth::SessionGuard;
use crate::config::{ConfigError, GatewayConfig};
use crate::controller::ControllerRegistry;
use crate::dispatcher::Dispatcher;
use crate::route_table::RouteTable;
use crate::static_files::StaticFiles;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Process-wide "installed" flag.
///
/// Starts from configuration and flips to `true` once, when the install
/// wizard completes. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct InstallState {
    installed: Arc<AtomicBool>,
}

impl InstallState {
    pub fn new(installed: bool) -> Self {
        Self {
            installed: Arc::new(AtomicBool::new(installed)),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Mark installation complete. Returns `false` if it already was.
    pub fn mark_installed(&self) -> bool {
        !self.installed.swap(true, Ordering::AcqRel)
    }
}

/// Collaborators handed to the gateway at construction time
pub struct Collaborators {
    /// Controllers in fallback order; the install controller is kept apart
    pub controllers: ControllerRegistry,
    /// Session pre-handling run before every installed-mode API call
    pub session_guard: Arc<dyn SessionGuard>,
    /// Handoff to the audit worker
    pub audit: AuditRecorder,
    /// Installed flag shared with the install controller
    pub install_state: InstallState,
}

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Per-request decision procedure
    pub dispatcher: Dispatcher,
    /// Audit handoff
    pub audit: AuditRecorder,
}

impl AppState {
    /// Validate the configuration, build the route table once, and wire the
    /// dispatcher to its collaborators.
    pub fn new(config: GatewayConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let Collaborators {
            controllers,
            session_guard,
            audit,
            install_state,
        } = collaborators;

        let routes = RouteTable::build(&controllers);
        info!(
            pre_install = routes.pre_install_len(),
            post_install = routes.post_install_len(),
            controllers = controllers.count(),
            installed = install_state.is_installed(),
            "Route table built"
        );

        let static_files = StaticFiles::new(config.static_root.clone(), config.index_file.clone());
        let dispatcher = Dispatcher::new(
            config.api_prefix.clone(),
            Arc::new(routes),
            Arc::new(controllers),
            install_state,
            session_guard,
            static_files,
        );

        Ok(Self {
            config,
            dispatcher,
            audit,
        })
    }
}

//! Exact-path route table, split by installation phase
//!
//! # Design Decisions
//! - Built once from the controller registry, immutable afterwards
//! - Shared through `Arc` with no locking
//! - Duplicate paths are last-write-wins in registration order, with a warning

use crate::controller::{ControllerRegistry, Handler, RouteMap};
use tracing::warn;

pub struct RouteTable {
    pre_install: RouteMap,
    post_install: RouteMap,
}

impl RouteTable {
    /// Collect routes from every registered controller.
    ///
    /// The install controller's routes form the pre-install table; all the
    /// others form the post-install table.
    pub fn build(registry: &ControllerRegistry) -> Self {
        let install = registry.install_controller();
        let pre_install = install.register_routes();

        let mut post_install = RouteMap::new();
        for controller in registry.controllers() {
            for (path, handler) in controller.register_routes() {
                if post_install.insert(path.clone(), handler).is_some() {
                    warn!(
                        path = %path,
                        controller = controller.name(),
                        "Duplicate route registration, later controller wins"
                    );
                }
            }
        }

        Self {
            pre_install,
            post_install,
        }
    }

    /// Route reachable before installation
    pub fn pre_install(&self, path: &str) -> Option<&Handler> {
        self.pre_install.get(path)
    }

    /// Route reachable once installed
    pub fn post_install(&self, path: &str) -> Option<&Handler> {
        self.post_install.get(path)
    }

    pub fn pre_install_len(&self) -> usize {
        self.pre_install.len()
    }

    pub fn post_install_len(&self) -> usize {
        self.post_install.len()
    }
}

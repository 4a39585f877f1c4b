//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of environment variables read by [`GatewayConfig::load`]
pub const ENV_PREFIX: &str = "CABINET";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid api prefix {0:?}: must start with '/', must not end with '/'")]
    InvalidApiPrefix(String),

    #[error("index file must be a plain file name, got {0:?}")]
    InvalidIndexFile(String),

    #[error("audit queue capacity must be greater than zero")]
    ZeroAuditCapacity,
}

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Paths under this prefix are API calls, everything else is a static asset
    pub api_prefix: String,
    /// Root directory of the static bundle
    pub static_root: PathBuf,
    /// Document served for `/` and for unknown static paths
    pub index_file: String,
    /// Whether installation has completed
    pub installed: bool,
    /// Audit records buffered before handoff spills onto spawned tasks
    pub audit_queue_capacity: usize,
    /// Spilled handoffs allowed to wait at once; further records are dropped
    pub audit_handoff_limit: usize,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6010,
            api_prefix: "/api".to_string(),
            static_root: PathBuf::from("html"),
            index_file: "index.html".to_string(),
            installed: false,
            audit_queue_capacity: 1024,
            audit_handoff_limit: crate::audit::DEFAULT_HANDOFF_LIMIT,
            max_body_size: 64 * 1024 * 1024, // 64 MB
            cors_enabled: false,
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration: defaults, then the optional TOML file, then
    /// `CABINET_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.api_prefix.as_str();
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(ConfigError::InvalidApiPrefix(self.api_prefix.clone()));
        }

        let index = self.index_file.as_str();
        if index.is_empty() || index.contains('/') || index.contains('\\') || index == ".." {
            return Err(ConfigError::InvalidIndexFile(self.index_file.clone()));
        }

        if self.audit_queue_capacity == 0 {
            return Err(ConfigError::ZeroAuditCapacity);
        }

        Ok(())
    }
}

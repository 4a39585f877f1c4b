//! Cabinet - self-hosted file storage gateway

use cabinet_gateway::{GatewayConfig, run_server};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cabinet")]
#[command(about = "HTTP gateway for the Cabinet self-hosted file storage server")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CABINET_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'H', long, env = "CABINET_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CABINET_PORT")]
    port: Option<u16>,

    /// Directory holding the web bundle
    #[arg(long, env = "CABINET_STATIC_ROOT")]
    static_root: Option<PathBuf>,

    /// Start with installation already completed
    #[arg(long, env = "CABINET_INSTALLED")]
    installed: bool,

    /// Enable debug logging
    #[arg(short, long, env = "CABINET_DEBUG")]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "CABINET_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cabinet_gateway={log_level},tower_http=debug").into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(static_root) = args.static_root {
        config.static_root = static_root;
    }
    if args.installed {
        config.installed = true;
    }

    tracing::info!("Starting Cabinet gateway on {}", config.bind_addr());
    if !config.static_root.is_dir() {
        tracing::warn!(
            "Static root {} does not exist, asset requests will fail",
            config.static_root.display()
        );
    }

    run_server(config).await
}

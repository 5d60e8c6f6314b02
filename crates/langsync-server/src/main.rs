//! LangSync server entry point.
//!
//! Loads the configuration, wires the keyboard backend, the notification
//! worker and the TCP listener together, and runs until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! langsync-server [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   Config file [default: platform config dir]
//!   --port      <PORT>   Listen port, overrides the config file
//!   --log-level <LEVEL>  Log level when RUST_LOG is unset, overrides the config file
//! ```
//!
//! | Variable             | Overrides     |
//! |----------------------|---------------|
//! | `LANGSYNC_CONFIG`    | `--config`    |
//! | `LANGSYNC_PORT`      | `--port`      |
//! | `LANGSYNC_LOG_LEVEL` | `--log-level` |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use langsync_server::application::platform::Notify;
use langsync_server::infrastructure::keyboard::keyboard_from_config;
use langsync_server::infrastructure::network::listener::{Server, ServerSettings};
use langsync_server::infrastructure::notify::{platform_notifier, NotificationQueue};
use langsync_server::infrastructure::storage::config::{load_config, load_config_from};

#[derive(Debug, Parser)]
#[command(
    name = "langsync-server",
    about = "Keyboard/mouse sharing server with keyboard-language synchronization",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "LANGSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on.
    #[arg(long, env = "LANGSYNC_PORT")]
    port: Option<u16>,

    /// `tracing` filter used when `RUST_LOG` is not set (e.g. `debug`).
    #[arg(long, env = "LANGSYNC_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => load_config().context("failed to load config")?,
    };
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(level) = cli.log_level {
        config.server.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!(name = %config.server.name, "LangSync server starting");

    let settings = ServerSettings::from_config(&config).context("invalid configuration")?;
    let keyboard =
        keyboard_from_config(&config.keyboard).context("failed to set up keyboard backend")?;
    info!(
        layouts = %keyboard.installed_layouts(),
        active = %keyboard.active_layout(),
        "keyboard layouts"
    );
    let notifier: Arc<dyn Notify> = Arc::new(
        NotificationQueue::spawn(platform_notifier())
            .context("failed to start notification worker")?,
    );

    let server = Server::new(settings, keyboard, notifier);
    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, version = %settings.version, "listening for clients");

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    server.serve(listener, running).await;

    info!("LangSync server stopped");
    Ok(())
}

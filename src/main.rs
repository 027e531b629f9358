//! gatekeeper binary: load configuration, initialize subsystems, serve.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatekeeper::config::{load_config_with, watcher::ConfigWatcher, Overrides};
use gatekeeper::lifecycle::{bootstrap, signals::shutdown_signal, Shutdown};
use gatekeeper::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "gatekeeper", version, about = "Authenticating HTTP API gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/gateway.toml")]
    config: PathBuf,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Reload routes and services when the configuration file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging();

    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));

    let overrides = Overrides { port: cli.port };
    let config = load_config_with(&cli.config, overrides)?;

    tracing::info!(
        path = ?cli.config,
        bind_address = %config.listener.bind_address(),
        routes = config.routes.len(),
        services = config.services.len(),
        plugins = config.plugins.len(),
        "Configuration loaded"
    );

    if let Some(raw) = &config.observability.metrics_address {
        match raw.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(metrics_address = %raw, "Failed to parse metrics address");
            }
        }
    }

    let bind_address = config.listener.bind_address();
    let server = bootstrap(config).await?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // the watcher stops emitting once dropped, so hold it for the server's lifetime
    let (config_updates, _watcher) = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        let watcher = watcher.with_overrides(overrides);
        (updates, Some(watcher.run()?))
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (updates, None)
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown.trigger_on(shutdown_signal());

    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

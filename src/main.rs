//! page-dispatch demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  PAGE DISPATCH                    │
//!                        │                                                   │
//!     Client Request     │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│ dispatch │───▶│   routing   │  │
//!                        │  │ server  │    │lifecycle │    │ first match │  │
//!                        │  └─────────┘    └────┬─────┘    └──────┬──────┘  │
//!                        │                      │                 │         │
//!                        │                      ▼                 ▼         │
//!                        │               ┌────────────┐   ┌─────────────┐   │
//!                        │               │  provider  │◀──│  resolver   │   │
//!                        │               │ (per req.) │   │  registry   │   │
//!                        │               └─────┬──────┘   └─────────────┘   │
//!     Client Response    │  ┌──────────┐       │                            │
//!     ◀──────────────────┼──│ encoding │◀──────┘                            │
//!                        │  └──────────┘                                    │
//!                        │  websocket: stream routes → shared providers     │
//!                        └──────────────────────────────────────────────────┘
//! ```

mod pages;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use page_dispatch::config::{load_config, validation::validate_config, AppConfig, ConfigError};
use page_dispatch::observability::logging;
use page_dispatch::{BasePage, Dispatcher, HttpServer, ProviderType, Shutdown, StreamEndpoints};

/// Serve the demo site through the page dispatcher.
#[derive(Parser, Debug)]
#[command(name = "page-dispatch", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `server.root`.
    #[arg(long)]
    root: Option<String>,

    /// Show error detail on 500 pages.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(root) = cli.root {
        config.server.root = root;
    }
    config.server.debug |= cli.debug;
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);
    tracing::info!("page-dispatch v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        root = %config.server.root,
        debug = config.server.debug,
        "Configuration loaded"
    );

    let config = Arc::new(config);
    let streams = StreamEndpoints::new();
    let dispatcher = Dispatcher::build(
        pages::routes(&streams),
        vec![ProviderType::of::<pages::Site>()],
        ProviderType::of::<BasePage>(),
        config.clone(),
    )?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    HttpServer::new(dispatcher, &streams)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

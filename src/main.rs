//! linkgate: composite application gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                     GATEWAY                      │
//!                     │                                                  │
//!   HTTP :port        │  ┌────────┐   ┌──────────┐   ┌───────────────┐  │
//!   ──────────────────┼─▶│  net   │──▶│ pipeline │──▶│ /api/v1  REST │  │
//!                     │  │listener│   │ (http)   │   │ /api/v2  gw ──┼──┼──┐
//!                     │  └────────┘   └──────────┘   │ /s       links│  │  │
//!                     │                              │ /assets, SPA  │  │  │
//!                     │                              └───────────────┘  │  │
//!   RPC :port+1       │  ┌──────────────┐                               │  │
//!   ──────────────────┼─▶│ tonic server │◀──────────────────────────────┼──┘
//!                     │  └──────────────┘                               │
//!                     │                                                  │
//!                     │  config · store · secret · lifecycle · metrics  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use linkgate::assets::{AssetProvider, DirAssets, MemoryAssets};
use linkgate::config::{load_config, validate_config, ConfigError, GatewayConfig, Mode};
use linkgate::lifecycle::signals;
use linkgate::observability::{logging, metrics};
use linkgate::store::{FileStore, MemoryStore, SettingsStore, StoreError};
use linkgate::{Server, Services};

#[derive(Parser)]
#[command(name = "linkgate", version)]
#[command(about = "Composite REST, RPC and static application gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Execution mode (dev, prod, demo)
    #[arg(long)]
    mode: Option<Mode>,

    /// HTTP port; RPC listens on port + 1
    #[arg(short, long)]
    port: Option<u16>,

    /// Data directory for persisted settings
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory holding the built web bundle
    #[arg(long)]
    assets: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(data) = &self.data {
            config.store.path = Some(data.join("settings.json"));
        }
        if let Some(assets) = &self.assets {
            config.assets.dir = assets.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("linkgate: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("linkgate: failed to initialize logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), mode = %config.mode, "linkgate starting");

    match run(config).await {
        Ok(()) => {
            tracing::info!("Exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

fn load(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let store = open_store(&config).await?;
    let assets = load_assets(&config).await;
    let server = Arc::new(Server::new(config, store, assets, Services::builtin()).await?);

    let mut runner = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });

    let finished = tokio::select! {
        _ = signals::wait_for_shutdown() => None,
        result = &mut runner => Some(result),
    };

    // A second signal during the drain skips the rest of the grace period.
    server.shutdown_with(signals::wait_for_shutdown()).await;

    let result = match finished {
        Some(result) => result,
        None => runner.await,
    };
    Ok(result??)
}

async fn open_store(config: &GatewayConfig) -> Result<Arc<dyn SettingsStore>, StoreError> {
    match &config.store.path {
        Some(path) => {
            let store = FileStore::open(path).await?;
            tracing::info!(path = %path.display(), "Settings store opened");
            Ok(Arc::new(store))
        }
        None => {
            if config.mode.is_prod() {
                tracing::warn!("No settings store path configured; the session secret will change on restart");
            }
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn load_assets(config: &GatewayConfig) -> Arc<dyn AssetProvider> {
    let dir = config.assets.dir.clone();
    let loaded = tokio::task::spawn_blocking(move || DirAssets::load(&dir)).await;
    match loaded {
        Ok(Ok(assets)) => {
            tracing::info!(dir = %config.assets.dir.display(), files = assets.len(), "Static bundle loaded");
            Arc::new(assets)
        }
        Ok(Err(e)) => {
            tracing::warn!(
                dir = %config.assets.dir.display(),
                error = %e,
                "Static bundle not found, serving APIs only"
            );
            Arc::new(MemoryAssets::new())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Static bundle loader panicked, serving APIs only");
            Arc::new(MemoryAssets::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn bundle_loads_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let mut config = GatewayConfig::default();
        config.assets.dir = dir.path().to_path_buf();

        let assets = load_assets(&config).await;
        assert!(assets.open("index.html").is_some());
    }

    #[tokio::test]
    async fn missing_bundle_serves_nothing() {
        let mut config = GatewayConfig::default();
        config.assets.dir = "/no/such/bundle".into();

        let assets = load_assets(&config).await;
        assert!(assets.open("index.html").is_none());
    }
}

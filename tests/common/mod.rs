//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use linkgate::assets::{AssetProvider, MemoryAssets};
use linkgate::store::{MemoryStore, SettingsStore};
use linkgate::{GatewayConfig, LifecycleState, Server, Services, StartupError};

/// Loopback config on a fixed port. RPC uses `port + 1`.
pub fn config(port: u16) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = port;
    config.timeouts.shutdown_grace_secs = 1;
    config
}

/// A small built bundle: root document, an icon, and one hashed asset.
pub fn bundle() -> Arc<dyn AssetProvider> {
    Arc::new(
        MemoryAssets::new()
            .with_file("index.html", "<html>app</html>")
            .with_file("favicon.ico", "icon")
            .with_file("assets/app.abc123.js", "console.log('app')")
            .with_file("api/v1/x", "leaked"),
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub struct Running {
    pub server: Arc<Server>,
    pub runner: JoinHandle<Result<(), StartupError>>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.server.http_addr(), path)
    }
}

/// Construct, start, and wait until the gateway is serving.
pub async fn spawn_gateway(
    config: GatewayConfig,
    store: Arc<dyn SettingsStore>,
    services: Services,
) -> Running {
    let server = Arc::new(
        Server::new(config, store, bundle(), services)
            .await
            .unwrap(),
    );
    let runner = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });
    wait_for_state(&server, LifecycleState::Running).await;
    Running { server, runner }
}

pub async fn spawn_default(port: u16) -> Running {
    spawn_gateway(config(port), Arc::new(MemoryStore::new()), Services::builtin()).await
}

pub async fn wait_for_state(server: &Server, target: LifecycleState) {
    let mut rx = server.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), async {
        while *rx.borrow_and_update() != target {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("gateway did not reach expected state");
}

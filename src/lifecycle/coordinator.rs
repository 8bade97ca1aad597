//! Gateway lifecycle: construct, start, shut down.
//!
//! # Startup order
//! 1. Validate config, provision the secret, register services (`Server::new`)
//! 2. Bind the RPC listener on `port + 1` and serve it on its own task
//! 3. Bind the HTTP listener on `port` and run the accept loop
//!
//! # Shutdown order
//! 1. Stop accepting HTTP connections and drain in-flight ones
//! 2. Stop the RPC listener
//! 3. Close the settings store
//!
//! Steps 1 and 2 share one deadline. Whatever is still open when it passes
//! is aborted.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{timeout_at, Instant};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;

use crate::assets::{static_router, AssetProvider};
use crate::config::{validate_config, ConfigError, GatewayConfig, ValidationError};
use crate::error::StartupError;
use crate::http::{build_pipeline, HttpServer};
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::net::Listener;
use crate::observability::metrics;
use crate::registrar::{register, ServiceContext, Services};
use crate::security::{provision_secret, Secret};
use crate::store::SettingsStore;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Handles to the tasks spawned by `start`.
#[derive(Default)]
struct Tasks {
    http: Option<HttpTask>,
    rpc: Option<JoinHandle<()>>,
}

struct HttpTask {
    abort: AbortHandle,
    done: watch::Receiver<bool>,
}

/// The composite gateway: REST, RPC, RPC gateway and static bundle.
pub struct Server {
    config: Arc<GatewayConfig>,
    router: Router,
    grpc: Routes,
    secret: Secret,
    store: Arc<dyn SettingsStore>,
    http_addr: SocketAddr,
    rpc_addr: SocketAddr,
    shutdown: Shutdown,
    stopping: AtomicBool,
    state: watch::Sender<LifecycleState>,
    rpc_failures: Arc<watch::Sender<Option<String>>>,
    tasks: Mutex<Tasks>,
}

impl Server {
    /// Build a server. Nothing is bound until `start`.
    ///
    /// Fails if the config is invalid, the secret cannot be provisioned, or a
    /// service cannot be registered.
    pub async fn new(
        config: GatewayConfig,
        store: Arc<dyn SettingsStore>,
        assets: Arc<dyn AssetProvider>,
        services: Services,
    ) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let http_addr = config.listener.http_addr()?;
        let rpc_addr = config.listener.rpc_addr()?;

        let secret = provision_secret(config.mode, store.as_ref())
            .await
            .map_err(StartupError::Secret)?;

        let config = Arc::new(config);
        let ctx = ServiceContext {
            secret: secret.clone(),
            mode: config.mode,
            store: store.clone(),
            config: config.clone(),
        };

        let registration = register(&services, &ctx, rpc_addr)?;
        let statics = static_router(assets, &config.assets).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidCacheControl(
                config.assets.cache_control.clone(),
            )])
        })?;
        let router = build_pipeline(&config, registration.api.merge(statics));

        let (state, _) = watch::channel(LifecycleState::Constructed);
        let (rpc_failures, _) = watch::channel(None);

        tracing::info!(
            mode = %config.mode,
            http = %http_addr,
            rpc = %rpc_addr,
            "Gateway constructed"
        );

        Ok(Self {
            config,
            router,
            grpc: registration.grpc,
            secret,
            store,
            http_addr,
            rpc_addr,
            shutdown: Shutdown::new(),
            stopping: AtomicBool::new(false),
            state,
            rpc_failures: Arc::new(rpc_failures),
            tasks: Mutex::new(Tasks::default()),
        })
    }

    /// Bind both listeners and serve until shutdown.
    ///
    /// Returns once the HTTP accept loop has ended. A bind failure on either
    /// listener is returned after the partially started server is torn down.
    pub async fn start(&self) -> Result<(), StartupError> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Constructed {
                *state = LifecycleState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(StartupError::AlreadyStarted);
        }

        let rpc_listener = match TcpListener::bind(self.rpc_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(address = %self.rpc_addr, error = %source, "RPC bind failed");
                self.abandon_start(None).await;
                return Err(StartupError::RpcBind {
                    addr: self.rpc_addr,
                    source,
                });
            }
        };
        tracing::info!(address = %self.rpc_addr, "RPC server starting");
        let rpc_task = tokio::spawn(serve_rpc(
            rpc_listener,
            self.grpc.clone(),
            self.shutdown.subscribe(),
            self.rpc_failures.clone(),
        ));

        let listener =
            match Listener::bind(self.http_addr, self.config.listener.max_connections).await {
                Ok(listener) => listener,
                Err(source) => {
                    tracing::error!(address = %self.http_addr, error = %source, "HTTP bind failed");
                    self.abandon_start(Some(rpc_task)).await;
                    return Err(StartupError::HttpBind {
                        addr: self.http_addr,
                        source,
                    });
                }
            };

        let (done_tx, done_rx) = watch::channel(false);
        let http = HttpServer::new(self.router.clone());
        let signal = self.shutdown.subscribe();
        let http_task = tokio::spawn(async move {
            let result = http.run(listener, signal).await;
            done_tx.send_replace(true);
            result
        });

        {
            let mut tasks = self.tasks.lock().await;
            tasks.http = Some(HttpTask {
                abort: http_task.abort_handle(),
                done: done_rx,
            });
            tasks.rpc = Some(rpc_task);
        }

        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Starting {
                *state = LifecycleState::Running;
                true
            } else {
                false
            }
        });
        tracing::info!(http = %self.http_addr, rpc = %self.rpc_addr, "Gateway running");

        match http_task.await {
            Ok(result) => result.map_err(StartupError::HttpServe),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(StartupError::HttpServe(std::io::Error::other(e.to_string()))),
        }
    }

    /// Shut down with the configured grace period.
    pub async fn shutdown(&self) {
        self.shutdown_with(std::future::pending::<()>()).await
    }

    /// Shut down, force-closing early if `cancel` completes first.
    ///
    /// Only the first call does anything. Sub-step failures are logged.
    pub async fn shutdown_with<F>(&self, cancel: F)
    where
        F: Future<Output = ()>,
    {
        if self.stopping.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shutdown already requested");
            return;
        }

        let grace = self.config.timeouts.shutdown_grace();
        tracing::info!(grace_secs = grace.as_secs(), "Shutting down");
        self.state.send_replace(LifecycleState::Stopping);
        self.shutdown.trigger();

        let deadline = Instant::now() + grace;
        let (http, rpc) = {
            let mut tasks = self.tasks.lock().await;
            (tasks.http.take(), tasks.rpc.take())
        };

        tokio::pin!(cancel);
        let mut cancelled = false;

        if let Some(task) = http {
            let drained = tokio::select! {
                res = timeout_at(deadline, wait_until_done(task.done)) => res.is_ok(),
                _ = &mut cancel => {
                    cancelled = true;
                    false
                }
            };
            if !drained {
                tracing::warn!("HTTP drain did not finish in time, closing remaining connections");
                task.abort.abort();
            }
        }

        if let Some(mut task) = rpc {
            let stopped = if cancelled {
                false
            } else {
                tokio::select! {
                    res = timeout_at(deadline, &mut task) => res.is_ok(),
                    _ = &mut cancel => false,
                }
            };
            if !stopped {
                tracing::warn!("RPC server did not stop in time, aborting");
                task.abort();
            }
        }

        self.close_store().await;
        self.state.send_replace(LifecycleState::Stopped);
        tracing::info!("Shutdown complete");
    }

    /// Router with the full request pipeline applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Failures of the RPC server after a successful bind.
    ///
    /// These do not stop the HTTP server.
    pub fn rpc_failures(&self) -> watch::Receiver<Option<String>> {
        self.rpc_failures.subscribe()
    }

    /// Tear down after a bind failure during `start`.
    async fn abandon_start(&self, rpc: Option<JoinHandle<()>>) {
        self.stopping.store(true, Ordering::Release);
        self.shutdown.trigger();
        if let Some(task) = rpc {
            task.abort();
        }
        self.close_store().await;
        self.state.send_replace(LifecycleState::Stopped);
    }

    async fn close_store(&self) {
        if let Err(e) = self.store.close().await {
            tracing::error!(error = %e, "Failed to close settings store");
        }
    }
}

async fn serve_rpc(
    listener: TcpListener,
    routes: Routes,
    mut signal: ShutdownSignal,
    failures: Arc<watch::Sender<Option<String>>>,
) {
    let serve = tonic::transport::Server::builder()
        .add_routes(routes)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            signal.recv().await
        });
    supervise_rpc(serve, &failures).await;
}

/// Await the RPC server and publish its failure. HTTP keeps serving either way.
async fn supervise_rpc<F, E>(serve: F, failures: &watch::Sender<Option<String>>)
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match serve.await {
        Ok(()) => tracing::info!("RPC server stopped"),
        Err(e) => {
            tracing::error!(error = %e, "RPC server failed");
            metrics::record_rpc_serve_failure();
            failures.send_replace(Some(e.to_string()));
        }
    }
}

async fn wait_until_done(mut done: watch::Receiver<bool>) {
    while !*done.borrow_and_update() {
        if done.changed().await.is_err() {
            return;
        }
    }
}

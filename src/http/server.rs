//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the registered routes in the request pipeline
//! - Configure HTTP/1.1 and HTTP/2 support
//! - Accept connections and hand them to hyper
//! - Drain in-flight connections on shutdown

use axum::{middleware, Router};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::config::GatewayConfig;
use crate::http::middleware::access_log;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::resilience::enforce_timeout;

/// Wrap `routes` in the fixed request pipeline.
///
/// Outermost first: request ID, access log, compression, CORS, timeout.
/// The timeout wraps handler dispatch only; the access log sees the final
/// status, including timeouts.
pub fn build_pipeline(config: &GatewayConfig, routes: Router) -> Router {
    routes
        .layer(middleware::from_fn_with_state(
            config.timeouts.request(),
            enforce_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(access_log))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for an already-built router.
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Accept connections until `shutdown` fires, then drain.
    ///
    /// Returns once every connection has finished. The caller bounds the
    /// drain by aborting this future's task; that drops the connection set
    /// and force-closes whatever is still open.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let builder = auto::Builder::new(TokioExecutor::new());
        let tracker = ConnectionTracker::new();
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            // Reap finished connection tasks.
            while connections.try_join_next().is_some() {}

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            let guard = tracker.track();
            let service = TowerToHyperService::new(self.router.clone());
            let builder = builder.clone();
            let mut drain = drain_rx.clone();

            connections.spawn(async move {
                let _permit = permit;
                let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    res = conn.as_mut() => res,
                    _ = drain.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.as_mut().await
                    }
                };

                if let Err(e) = result {
                    tracing::debug!(connection_id = %guard.id(), peer = %peer, error = %e, "Connection error");
                }
            });
        }

        drop(listener);
        drain_tx.send_replace(true);
        tracing::info!(
            active_connections = tracker.active_count(),
            "HTTP listener closed, draining connections"
        );

        while connections.join_next().await.is_some() {}

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

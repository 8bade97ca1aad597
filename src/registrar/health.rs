//! RPC v2 health checking and its REST gateway.
//!
//! # Responsibilities
//! - Serve `grpc.health.v1.Health` on the RPC listener
//! - Translate `GET /v2/health?service=` into a `Health/Check` call
//!
//! # Design Decisions
//! - The gateway channel connects lazily, so registration never waits on the
//!   RPC listener
//! - An unknown service maps to 404; any other RPC failure maps to 502

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tonic::service::Routes;
use tonic::transport::{Channel, Endpoint};
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use super::{dial_addr, RegistrarError, RpcApi, ServiceContext};
use crate::http::error::{ApiError, ApiResult};

/// Standard gRPC health service. Reports the whole server as `SERVING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthRpc;

impl RpcApi for HealthRpc {
    fn grpc_routes(&self, _ctx: &ServiceContext) -> Routes {
        let (_reporter, service) = tonic_health::server::health_reporter();
        Routes::new(service)
    }

    fn gateway(
        &self,
        _ctx: &ServiceContext,
        rpc_addr: SocketAddr,
    ) -> Result<Router, RegistrarError> {
        let uri = format!("http://{}", dial_addr(rpc_addr));
        let channel = Endpoint::from_shared(uri.clone())
            .map_err(|source| RegistrarError::Endpoint { uri, source })?
            .connect_lazy();

        Ok(Router::new()
            .route("/v2/health", get(check_health))
            .with_state(HealthClient::new(channel)))
    }
}

#[derive(Debug, Deserialize)]
struct HealthQuery {
    service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

async fn check_health(
    State(mut client): State<HealthClient<Channel>>,
    Query(query): Query<HealthQuery>,
) -> ApiResult<Json<HealthStatus>> {
    let service = query.service.unwrap_or_default();

    match client
        .check(HealthCheckRequest {
            service: service.clone(),
        })
        .await
    {
        Ok(response) => Ok(Json(HealthStatus {
            status: response.into_inner().status().as_str_name(),
        })),
        Err(status) if status.code() == tonic::Code::NotFound => {
            Err(ApiError::NotFound(format!("health service {:?}", service)))
        }
        Err(status) => {
            tracing::warn!(code = ?status.code(), error = %status.message(), "Health check RPC failed");
            Err(ApiError::BadGateway(status.message().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, Mode};
    use crate::security::Secret;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tower::ServiceExt;

    fn context() -> ServiceContext {
        ServiceContext {
            secret: Secret::new("x"),
            mode: Mode::Dev,
            store: Arc::new(MemoryStore::new()),
            config: Arc::new(GatewayConfig::default()),
        }
    }

    async fn spawn_rpc() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = HealthRpc.grpc_routes(&context());
        tokio::spawn(
            tonic::transport::Server::builder()
                .add_routes(routes)
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );
        addr
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn gateway_reports_serving() {
        let addr = spawn_rpc().await;
        let gateway = HealthRpc.gateway(&context(), addr).unwrap();

        let (status, body) = get_json(gateway, "/v2/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SERVING");
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let addr = spawn_rpc().await;
        let gateway = HealthRpc.gateway(&context(), addr).unwrap();

        let (status, body) = get_json(gateway, "/v2/health?service=nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn unreachable_rpc_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = HealthRpc.gateway(&context(), addr).unwrap();
        let (status, body) = get_json(gateway, "/v2/health").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "bad_gateway");
    }
}

//! Service registration for both API surfaces.
//!
//! # Data Flow
//! ```text
//! ServiceContext (secret, mode, store, config)
//!     → RestApi::routes      → nested at /api/v1
//!     → RpcApi::grpc_routes  → served natively on the RPC listener
//!     → RpcApi::gateway      → REST translation merged into /api
//!     → ResourceApi::routes  → nested at assets.redirect_prefix
//! ```
//!
//! # Design Decisions
//! - Collaborators receive the context by reference and clone what they keep
//! - The gateway dials the RPC listener like any external client
//! - Registration only builds routers; nothing is bound or spawned here

pub mod health;
pub mod status;

use axum::Router;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tonic::service::Routes;

use crate::config::{GatewayConfig, Mode, API_PREFIX};
use crate::security::Secret;
use crate::store::SettingsStore;

pub use health::HealthRpc;
pub use status::StatusApi;

/// Dependencies shared by every registered service.
#[derive(Clone)]
pub struct ServiceContext {
    pub secret: Secret,
    pub mode: Mode,
    pub store: Arc<dyn SettingsStore>,
    pub config: Arc<GatewayConfig>,
}

/// REST v1 service. Routes are relative to `/api/v1`.
pub trait RestApi: Send + Sync {
    fn routes(&self, ctx: &ServiceContext) -> Router;
}

/// RPC v2 service, reachable natively and through the REST gateway.
pub trait RpcApi: Send + Sync {
    /// Services mounted on the RPC listener.
    fn grpc_routes(&self, ctx: &ServiceContext) -> Routes;

    /// REST translation routes, relative to `/api`. Calls go over the network
    /// to `rpc_addr`.
    fn gateway(&self, ctx: &ServiceContext, rpc_addr: SocketAddr)
        -> Result<Router, RegistrarError>;
}

/// Short-link resource service. Routes are relative to `/s`.
pub trait ResourceApi: Send + Sync {
    fn routes(&self, ctx: &ServiceContext) -> Router;
}

/// The set of collaborators a server registers.
#[derive(Clone)]
pub struct Services {
    pub rest: Arc<dyn RestApi>,
    pub rpc: Arc<dyn RpcApi>,
    pub resource: Option<Arc<dyn ResourceApi>>,
}

impl Services {
    /// Status endpoint plus gRPC health checking.
    pub fn builtin() -> Self {
        Self {
            rest: Arc::new(StatusApi),
            rpc: Arc::new(HealthRpc),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: Arc<dyn ResourceApi>) -> Self {
        self.resource = Some(resource);
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("invalid RPC endpoint {uri}: {source}")]
    Endpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("{service} registration failed: {reason}")]
    Service {
        service: &'static str,
        reason: String,
    },
}

/// Routers produced by registration.
pub struct Registration {
    /// HTTP routes for `/api` and `/s`. Has no fallback of its own.
    pub api: Router,
    /// Services for the RPC listener.
    pub grpc: Routes,
}

/// Register every service against one context.
pub fn register(
    services: &Services,
    ctx: &ServiceContext,
    rpc_addr: SocketAddr,
) -> Result<Registration, RegistrarError> {
    let grpc = services.rpc.grpc_routes(ctx);
    let gateway = services.rpc.gateway(ctx, rpc_addr)?;

    let api_group = Router::new()
        .nest("/v1", services.rest.routes(ctx))
        .merge(gateway);
    let mut api = Router::new().nest(nest_path(API_PREFIX), api_group);

    if let Some(resource) = &services.resource {
        let prefix = nest_path(&ctx.config.assets.redirect_prefix);
        api = api.nest(prefix, resource.routes(ctx));
    }

    tracing::debug!(rpc_addr = %rpc_addr, "Services registered");
    Ok(Registration { api, grpc })
}

/// `/s/` → `/s`. Reserved prefixes carry a trailing slash, nest paths do not.
fn nest_path(prefix: &str) -> &str {
    prefix.strip_suffix('/').unwrap_or(prefix)
}

/// Address a local client should dial to reach a listener bound on `addr`.
///
/// Wildcard binds are reached over loopback.
pub fn dial_addr(addr: SocketAddr) -> SocketAddr {
    if !addr.ip().is_unspecified() {
        return addr;
    }
    let ip = match addr.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
    };
    SocketAddr::new(ip, addr.port())
}

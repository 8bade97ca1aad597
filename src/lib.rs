//! Composite application gateway.
//!
//! Serves a REST v1 API, an RPC v2 API (natively and through a REST
//! translation gateway) and a static single-page application from one
//! process.

pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registrar;
pub mod resilience;
pub mod security;
pub mod store;

pub use config::schema::GatewayConfig;
pub use error::StartupError;
pub use lifecycle::{LifecycleState, Server, Shutdown};
pub use registrar::{ServiceContext, Services};
pub use security::Secret;

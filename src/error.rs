//! Top-level gateway errors.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::net::ListenerError;
use crate::registrar::RegistrarError;
use crate::store::StoreError;

/// Failures that prevent the gateway from starting.
///
/// Every variant is fatal: the process should log it and exit non-zero.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid listener address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to provision session secret: {0}")]
    Secret(#[source] StoreError),

    #[error("failed to register services: {0}")]
    Gateway(#[from] RegistrarError),

    #[error("failed to bind RPC listener on {addr}: {source}")]
    RpcBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind HTTP listener on {addr}: {source}")]
    HttpBind {
        addr: SocketAddr,
        #[source]
        source: ListenerError,
    },

    #[error("HTTP server failed: {0}")]
    HttpServe(#[source] std::io::Error),

    #[error("server was already started")]
    AlreadyStarted,
}

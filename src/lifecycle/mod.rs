//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (coordinator.rs):
//!     Validate config → Provision secret → Register services → Build pipeline
//!
//! Start (coordinator.rs):
//!     Bind RPC → Spawn RPC serve → Bind HTTP → Run accept loop
//!
//! Shutdown (shutdown.rs, coordinator.rs):
//!     Trigger → Drain HTTP → Stop RPC → Close store
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: RPC before HTTP, so the gateway has a target
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has one deadline; stragglers are aborted

pub mod coordinator;
pub mod shutdown;
pub mod signals;

pub use coordinator::{LifecycleState, Server};
pub use shutdown::{Shutdown, ShutdownSignal};

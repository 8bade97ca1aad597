//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → secret.rs (look up or create the session signing secret)
//!     → Shared with REST and RPC registration
//! ```
//!
//! # Design Decisions
//! - One secret per workspace, created once and reused
//! - The secret value never appears in logs

pub mod secret;

pub use secret::{provision_secret, Secret, DEV_SECRET};

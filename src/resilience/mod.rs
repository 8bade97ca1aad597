//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatch:
//!     → timeouts.rs (bound handler time, 503 on expiry)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every request has a deadline
//! - Resilience logic is composable middleware

pub mod timeouts;

pub use timeouts::enforce_timeout;

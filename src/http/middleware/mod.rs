//! HTTP middleware shared by every route.

pub mod access_log;

pub use access_log::access_log;

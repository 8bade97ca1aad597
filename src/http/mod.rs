//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, HTTP/1.1 or HTTP/2)
//!     → request.rs (assign and echo request ID)
//!     → middleware/access_log.rs (one line per request)
//!     → compression, CORS, request timeout
//!     → registered API routes, then static fallback
//!     → error.rs (JSON error bodies)
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::{ApiError, ApiResult, ErrorMessage, ErrorResponse};
pub use request::X_REQUEST_ID;
pub use server::{build_pipeline, HttpServer};

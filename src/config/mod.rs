//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the registrar and coordinator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the pipeline is built once at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AssetsConfig, GatewayConfig, ListenerConfig, LogFormat, Mode, ObservabilityConfig,
    StoreConfig, TimeoutConfig, API_PREFIX,
};
pub use validation::{validate_config, ValidationError};

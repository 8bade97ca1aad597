//! Workspace settings persistence.
//!
//! # Data Flow
//! ```text
//! Secret provisioner / REST handlers
//!     → SettingsStore::find(key)     (absence is Ok(None))
//!     → SettingsStore::upsert(key, value)
//!     → backend (memory.rs | file.rs)
//! ```
//!
//! # Design Decisions
//! - Keys come from a closed enum; no free-form keys reach the backend
//! - Upsert is the only mutation; rows are never deleted here
//! - Backends own their own concurrency (DashMap, write mutex)

pub mod file;
pub mod memory;
pub mod settings;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use settings::{Setting, SettingKey, SettingsStore, StoreError, StoreResult};

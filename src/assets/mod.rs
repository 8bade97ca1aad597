//! Static frontend bundle serving.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs skip rule (API / short-link prefixes never reach the bundle)
//!     → /assets/* mount   → provider lookup → immutable Cache-Control
//!     → everything else   → provider lookup → SPA fallback to index.html
//! ```
//!
//! # Design Decisions
//! - The bundle is an injected read-only provider, decoupled from how it was
//!   built or embedded
//! - Skip rule runs before any lookup
//! - Missing hashed assets are 404, never the root document

pub mod provider;
pub mod router;

pub use provider::{content_type, AssetProvider, DirAssets, MemoryAssets};
pub use router::{static_router, SkipRule, INDEX_DOCUMENT};

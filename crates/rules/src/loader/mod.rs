//! Filesystem document loader with hot-reload via `notify` watcher.
//!
//! Scans the rules directory for YAML atoms and compositions, validates
//! them, and routes atoms into the [`AtomRegistry`] and compositions into
//! the [`CompositionCatalog`]. Supports both kinds via two-pass
//! deserialization (RuleEnvelope -> RuleDocument).
//!
//! [`AtomRegistry`]: crate::registry::AtomRegistry
//! [`CompositionCatalog`]: crate::store::CompositionCatalog

mod core;
mod error;
mod watcher;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};

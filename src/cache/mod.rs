//! Persisted local cache for state that must survive restarts.
//!
//! This module provides a domain-agnostic key/value layer that:
//! - Stores JSON-serialized values grouped by namespace (one per store)
//! - Backs onto SQLite on disk, or memory for tests and ephemeral runs
//! - Describes where served data came from (network, cache, offline fallback)

mod storage;
mod traits;

pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};
pub use traits::{remove_by_key, replace_by_key, CacheResult, CacheSource, Cacheable};

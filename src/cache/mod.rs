//! Location cache with best-effort persistence
//!
//! This module keeps resolved username locations in memory and persists the
//! live entries to a key-value store. Each entry carries its own expiry;
//! expired or unresolved entries are treated as absent and never written
//! back. Store failures never reach callers: they are logged, or suppressed
//! entirely when the hosting session is being torn down.

mod location;
mod persist;
pub mod store;

pub use location::{CacheEntry, LocationCache};
pub use persist::{CachePersistence, PersistHandle};
pub use store::{FileStore, KeyValueStore, StoreError};

//! Version storage for Verso.
//!
//! [`VersionStore`] is the contract the engine depends on: immutable version
//! rows keyed by a content-derived id, and a per-content head pointer that
//! only moves by compare-and-set. Two backends are provided:
//!
//! - [`MemoryVersionStore`]: a flat arena guarded by a `tokio` RwLock, for
//!   tests and embedding.
//! - [`SqliteVersionStore`]: SQLite via `rusqlite`, for durable storage. The
//!   head CAS is a single conditional `UPDATE`.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryVersionStore;
pub use sqlite::SqliteVersionStore;
pub use store::VersionStore;

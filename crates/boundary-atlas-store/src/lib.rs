//! # Boundary Atlas Store
//!
//! Persistence for committed datasets. Two traits keep the facade
//! storage-agnostic:
//!
//! - [`ContentStore`] - blobs keyed by their SHA-256 (serialized datasets)
//! - [`Registry`] - append-only snapshots, per-snapshot district entries,
//!   and a hash-chained audit log
//!
//! [`SqliteStore`] is the persistent implementation; [`MemoryStore`] has
//! the same semantics for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boundary_atlas_store::{Registry, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("atlas.db").unwrap();
//!     let latest = store.latest_snapshot().await.unwrap();
//!     println!("{:?}", latest.map(|s| s.id));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same record twice returns `AlreadyExists`
//! - **Conflict detection**: A different record under the same id is an error
//! - **Append-only**: SQLite triggers refuse updates and deletes on registry tables
//! - **Audit chain**: [`AuditChain`] folds events into a BLAKE3 head; [`verify_chain`]
//!   recomputes it

pub mod audit;
mod codec;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use audit::{verify_chain, AuditChain, AuditEvent, AuditEventKind, ChainBreak, StoredEvent};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContentMetadata, ContentStore, DistrictEntry, InsertResult, Registry};

/// Current time in Unix ms.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

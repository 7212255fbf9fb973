//! Error types for the Atlas facade.

use boundary_atlas_core::{BoundaryType, CoreError, Digest};
use boundary_atlas_merkle::{MerkleError, SnapshotId};
use boundary_atlas_resolver::ResolverError;
use boundary_atlas_store::{ChainBreak, StoreError};
use thiserror::Error;

/// Errors that can occur during Atlas operations.
///
/// Rejected data is not an error: it is reported in
/// [`IngestReport`](crate::IngestReport). These are operational failures.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("audit chain error: {0}")]
    AuditChain(#[from] ChainBreak),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A stored dataset could not be encoded or decoded.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Two sources in one batch claim the same jurisdiction and tier.
    #[error("more than one source for {jurisdiction} {district_type}")]
    DuplicateSource {
        jurisdiction: String,
        district_type: BoundaryType,
    },

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// The snapshot's dataset pointer names content the store does not have.
    #[error("dataset {pointer} for snapshot {id} is missing")]
    DatasetMissing { id: SnapshotId, pointer: Digest },

    /// The stored dataset rebuilds to a different root than was published.
    #[error("snapshot {id} rebuilds to {rebuilt}, recorded root is {recorded}")]
    RootMismatch {
        id: SnapshotId,
        recorded: Digest,
        rebuilt: Digest,
    },

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for Atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;

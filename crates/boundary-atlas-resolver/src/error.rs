//! Error types for the resolver.

use boundary_atlas_merkle::SnapshotId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    /// The snapshot record does not describe the tree it was paired with.
    #[error("snapshot {id} does not match tree: recorded root {recorded}, tree root {actual}")]
    SnapshotMismatch {
        id: SnapshotId,
        recorded: String,
        actual: String,
    },
}

pub type Result<T> = std::result::Result<T, ResolverError>;

//! The active committed district set and its atomic handle.
//!
//! A [`CommittedSnapshot`] bundles the published record, the Merkle tree
//! that owns the districts, and a per-tier spatial index. It is never
//! mutated. [`SnapshotHandle`] swaps the active one atomically: a query
//! that loaded the old snapshot keeps it until it finishes.

use arc_swap::ArcSwapOption;
use boundary_atlas_merkle::{MerkleTree, Snapshot};
use std::sync::Arc;
use tracing::info;

use crate::error::{ResolverError, Result};
use crate::index::TierIndex;

#[derive(Debug)]
pub struct CommittedSnapshot {
    snapshot: Snapshot,
    tree: MerkleTree,
    index: TierIndex,
}

impl CommittedSnapshot {
    /// Pair a snapshot record with its tree, checking they agree.
    pub fn new(snapshot: Snapshot, tree: MerkleTree) -> Result<Self> {
        if !snapshot.matches_tree(&tree) {
            return Err(ResolverError::SnapshotMismatch {
                id: snapshot.id.clone(),
                recorded: snapshot.merkle_root.to_hex(),
                actual: tree.root().to_hex(),
            });
        }
        let index = TierIndex::build(tree.districts());
        Ok(Self {
            snapshot,
            tree,
            index,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn index(&self) -> &TierIndex {
        &self.index
    }
}

/// Lock-free holder of the active snapshot.
#[derive(Debug, Default)]
pub struct SnapshotHandle {
    current: ArcSwapOption<CommittedSnapshot>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(committed: CommittedSnapshot) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(committed),
        }
    }

    /// The active snapshot, if any. Holding the `Arc` pins it.
    pub fn load(&self) -> Option<Arc<CommittedSnapshot>> {
        self.current.load_full()
    }

    /// Make `committed` active; returns the one it replaced.
    pub fn swap(&self, committed: CommittedSnapshot) -> Option<Arc<CommittedSnapshot>> {
        let next = Arc::new(committed);
        info!(
            snapshot = %next.snapshot.id,
            root = %next.snapshot.merkle_root,
            districts = next.snapshot.district_count,
            "activated snapshot"
        );
        self.current.swap(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_core::{sha256, HashFunction};

    fn committed(created_at: i64) -> CommittedSnapshot {
        let tree = MerkleTree::build(vec![], HashFunction::Sha256).unwrap();
        let snapshot = Snapshot::for_tree(&tree, sha256(b""), created_at, None);
        CommittedSnapshot::new(snapshot, tree).unwrap()
    }

    #[test]
    fn test_mismatched_record_rejected() {
        let tree = MerkleTree::build(vec![], HashFunction::Sha256).unwrap();
        let mut snapshot = Snapshot::for_tree(&tree, sha256(b""), 1, None);
        snapshot.merkle_root = sha256(b"other");
        assert!(matches!(
            CommittedSnapshot::new(snapshot, tree),
            Err(ResolverError::SnapshotMismatch { .. })
        ));
    }

    #[test]
    fn test_in_flight_reader_keeps_old_snapshot() {
        let handle = SnapshotHandle::with_snapshot(committed(1));
        let pinned = handle.load().unwrap();

        let previous = handle.swap(committed(2)).unwrap();
        assert_eq!(previous.snapshot().created_at, 1);
        assert_eq!(pinned.snapshot().created_at, 1);
        assert_eq!(handle.load().unwrap().snapshot().created_at, 2);
    }

    #[test]
    fn test_empty_handle() {
        assert!(SnapshotHandle::new().load().is_none());
    }
}

//! Snapshot: the immutable publication record for one committed root.

use boundary_atlas_core::{Digest, HashFunction};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tree::MerkleTree;

/// Snapshot identifier, `snap-<created_at>-<root prefix>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Derive the id from the committed root and creation time.
    pub fn derive(root: &Digest, created_at: i64) -> Self {
        Self(format!("snap-{}-{}", created_at, &root.to_hex()[..16]))
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotId({})", self.0)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A published dataset version. Never mutated; a later snapshot names this
/// one in `supersedes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub merkle_root: Digest,
    pub district_count: usize,
    /// Content hash of the serialized dataset in the content store.
    pub dataset_pointer: Digest,
    /// Country/region scopes covered, e.g. `us/wa`. Sorted and deduplicated.
    pub regions: Vec<String>,
    pub hash_function: HashFunction,
    /// Unix ms.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<SnapshotId>,
}

impl Snapshot {
    /// Record for a freshly built tree.
    ///
    /// Regions are the `country/region` prefixes of the committed
    /// jurisdictions.
    pub fn for_tree(
        tree: &MerkleTree,
        dataset_pointer: Digest,
        created_at: i64,
        supersedes: Option<SnapshotId>,
    ) -> Self {
        let mut regions: Vec<String> = tree
            .districts()
            .iter()
            .map(|d| {
                d.jurisdiction()
                    .splitn(3, '/')
                    .take(2)
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect();
        regions.sort();
        regions.dedup();

        Self {
            id: SnapshotId::derive(&tree.root(), created_at),
            merkle_root: tree.root(),
            district_count: tree.len(),
            dataset_pointer,
            regions,
            hash_function: tree.hash_function(),
            created_at,
            supersedes,
        }
    }

    /// Whether `tree` is the commitment this record describes.
    pub fn matches_tree(&self, tree: &MerkleTree) -> bool {
        self.merkle_root == tree.root()
            && self.district_count == tree.len()
            && self.hash_function == tree.hash_function()
    }

    /// Whether the snapshot covers a country (first path segment).
    pub fn covers_country(&self, country: &str) -> bool {
        self.regions
            .iter()
            .any(|r| r.split('/').next() == Some(country))
    }
}

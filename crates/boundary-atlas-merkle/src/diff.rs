//! Differences between two committed district sets.

use boundary_atlas_core::{Digest, DistrictId, HashFunction};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::tree::MerkleTree;

/// Ids added, removed, or changed between two trees, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<DistrictId>,
    pub removed: Vec<DistrictId>,
    pub changed: Vec<DistrictId>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare two trees by id and leaf content.
///
/// Trees built with different hash functions are compared by SHA-256 leaf
/// digests recomputed from the districts.
pub fn diff_snapshots(old: &MerkleTree, new: &MerkleTree) -> Result<SnapshotDiff> {
    let old_leaves = comparable_leaves(old, new.hash_function())?;
    let new_leaves = comparable_leaves(new, old.hash_function())?;

    let mut diff = SnapshotDiff::default();
    for (id, leaf) in &new_leaves {
        match old_leaves.get(id) {
            None => diff.added.push(id.clone()),
            Some(prev) if prev != leaf => diff.changed.push(id.clone()),
            Some(_) => {}
        }
    }
    diff.removed = old_leaves
        .keys()
        .filter(|id| !new_leaves.contains_key(*id))
        .cloned()
        .collect();
    Ok(diff)
}

fn comparable_leaves(tree: &MerkleTree, other: HashFunction) -> Result<BTreeMap<DistrictId, Digest>> {
    let mut out = BTreeMap::new();
    for (district, leaf) in tree.districts().iter().zip(tree.leaves()) {
        let leaf = if tree.hash_function() == other {
            *leaf
        } else {
            district.leaf_hash(HashFunction::Sha256)?
        };
        out.insert(district.id().clone(), leaf);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_core::{
        AcquisitionMethod, AuthorityClass, BoundaryGeometry, BoundaryType, Canonicalizer,
        DistrictRecord, NormalizedDistrict, ProvenanceMetadata, RawBoundary,
    };
    use geo::polygon;

    fn district(n: u32, name: &str) -> NormalizedDistrict {
        let x = f64::from(n) * 0.01;
        let raw = RawBoundary {
            country: "us".into(),
            region: "wa".into(),
            locality: Some("seattle".into()),
            district: n.to_string(),
            name: name.into(),
            district_type: BoundaryType::CouncilDistrict,
            geometry: BoundaryGeometry::Polygon(polygon![
                (x: x, y: 0.0), (x: x + 0.01, y: 0.0), (x: x + 0.01, y: 0.01), (x: x, y: 0.01), (x: x, y: 0.0)
            ]),
            provenance: ProvenanceMetadata::for_payload(
                "test://seattle",
                AuthorityClass::Municipal,
                0,
                AcquisitionMethod::Manual,
                b"{}",
                200,
                1,
                "Polygon",
            ),
        };
        Canonicalizer::default().canonicalize(&raw).unwrap()
    }

    fn tree(districts: Vec<NormalizedDistrict>, hash: HashFunction) -> MerkleTree {
        MerkleTree::build(districts, hash).unwrap()
    }

    fn ids(ns: &[u32]) -> Vec<DistrictId> {
        ns.iter()
            .map(|n| DistrictId::parse(&format!("us-wa-seattle-{n}")).unwrap())
            .collect()
    }

    #[test]
    fn test_identical_trees_have_empty_diff() {
        let a = tree(vec![district(1, "One"), district(2, "Two")], HashFunction::Sha256);
        let b = tree(vec![district(2, "Two"), district(1, "One")], HashFunction::Sha256);
        assert!(diff_snapshots(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn test_added_removed_changed() {
        let old = tree(
            vec![district(1, "One"), district(2, "Two"), district(3, "Three")],
            HashFunction::Sha256,
        );
        let new = tree(
            vec![district(2, "Two"), district(3, "Third"), district(4, "Four"), district(5, "Five")],
            HashFunction::Sha256,
        );
        let diff = diff_snapshots(&old, &new).unwrap();
        assert_eq!(diff.added, ids(&[4, 5]));
        assert_eq!(diff.removed, ids(&[1]));
        assert_eq!(diff.changed, ids(&[3]));
    }

    #[test]
    fn test_provenance_only_change_is_not_a_change() {
        let a = district(1, "One");
        let mut record = DistrictRecord::from(a.clone());
        record.provenance.acquired_at = 42;
        let b = NormalizedDistrict::try_from(record).unwrap();
        let diff = diff_snapshots(
            &tree(vec![a], HashFunction::Sha256),
            &tree(vec![b], HashFunction::Sha256),
        )
        .unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_mixed_hash_functions_compare_content() {
        let old = tree(vec![district(1, "One"), district(2, "Two")], HashFunction::Sha256);
        let new = tree(vec![district(1, "One"), district(2, "Deux")], HashFunction::Poseidon);
        let diff = diff_snapshots(&old, &new).unwrap();
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.changed, ids(&[2]));
    }
}

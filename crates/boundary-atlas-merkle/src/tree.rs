//! Merkle tree over canonical district leaves.

use boundary_atlas_core::{Digest, DistrictId, HashFunction, NormalizedDistrict};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{MerkleError, Result};
use crate::proof::{self, MerkleProof};

/// An immutable commitment over a set of districts.
///
/// Districts are stored sorted by id, so the root is a pure function of set
/// membership and content. The hash function is fixed at construction.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hash_function: HashFunction,
    root: Digest,
    /// `layers[0]` are the leaves; the last layer holds the root.
    layers: Vec<Vec<Digest>>,
    districts: Vec<NormalizedDistrict>,
    index: HashMap<DistrictId, usize>,
}

impl MerkleTree {
    /// Build a tree from districts in any order.
    pub fn build(mut districts: Vec<NormalizedDistrict>, hash_function: HashFunction) -> Result<Self> {
        // 1. Sort by id; duplicates are an error
        districts.sort_by(|a, b| a.id().as_str().as_bytes().cmp(b.id().as_str().as_bytes()));
        if let Some(pair) = districts.windows(2).find(|w| w[0].id() == w[1].id()) {
            return Err(MerkleError::DuplicateDistrict(pair[0].id().clone()));
        }

        // 2. Hash leaves
        let leaves = districts
            .par_iter()
            .map(|d| d.leaf_hash(hash_function))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // 3. Pairwise up to the root
        let mut layers = vec![leaves];
        while layers.last().map_or(false, |l| l.len() > 1) {
            let next = match layers.last() {
                Some(layer) => next_layer(layer, hash_function)?,
                None => break,
            };
            layers.push(next);
        }

        let root = layers
            .last()
            .and_then(|l| l.first().copied())
            .unwrap_or_else(|| hash_function.empty_root());

        let index = districts
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id().clone(), i))
            .collect();

        debug!(
            leaves = districts.len(),
            depth = layers.len().saturating_sub(1),
            hash = %hash_function,
            root = %root,
            "built merkle tree"
        );

        Ok(Self {
            hash_function,
            root,
            layers,
            districts,
            index,
        })
    }

    pub fn root(&self) -> Digest {
        self.root
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Leaf digests in sorted-id order.
    pub fn leaves(&self) -> &[Digest] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layers(&self) -> &[Vec<Digest>] {
        &self.layers
    }

    /// Committed districts in sorted-id order.
    pub fn districts(&self) -> &[NormalizedDistrict] {
        &self.districts
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn get(&self, id: &DistrictId) -> Option<&NormalizedDistrict> {
        self.index.get(id).map(|&i| &self.districts[i])
    }

    pub fn leaf_of(&self, id: &DistrictId) -> Option<Digest> {
        self.index.get(id).map(|&i| self.leaves()[i])
    }

    /// Inclusion proof for a committed district, siblings leaf-to-root.
    pub fn prove_inclusion(&self, id: &DistrictId) -> Option<MerkleProof> {
        let mut idx = *self.index.get(id)?;
        let leaf = self.leaves()[idx];

        let mut siblings = Vec::with_capacity(self.layers.len().saturating_sub(1));
        for layer in &self.layers[..self.layers.len() - 1] {
            // An odd trailing node is paired with itself.
            let sibling = layer.get(idx ^ 1).unwrap_or(&layer[idx]);
            siblings.push(*sibling);
            idx /= 2;
        }

        Some(MerkleProof {
            root: self.root,
            leaf,
            siblings,
            district_id: id.to_string(),
        })
    }

    /// Verify a proof against this tree's root and hash function.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.root == self.root && proof::verify_proof(proof, self.hash_function)
    }

    pub fn into_districts(self) -> Vec<NormalizedDistrict> {
        self.districts
    }
}

fn next_layer(layer: &[Digest], hash: HashFunction) -> Result<Vec<Digest>> {
    layer
        .par_chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash.hash_pair(left, right)
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(MerkleError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_core::{
        AcquisitionMethod, AuthorityClass, BoundaryGeometry, BoundaryType, Canonicalizer,
        ProvenanceMetadata, RawBoundary,
    };
    use geo::polygon;
    use proptest::prelude::*;

    fn district(n: u32) -> NormalizedDistrict {
        let x = f64::from(n) * 0.01;
        let geometry = BoundaryGeometry::Polygon(polygon![
            (x: x, y: 0.0), (x: x + 0.01, y: 0.0), (x: x + 0.01, y: 0.01), (x: x, y: 0.01), (x: x, y: 0.0)
        ]);
        let raw = RawBoundary {
            country: "us".into(),
            region: "wa".into(),
            locality: Some("seattle".into()),
            district: n.to_string(),
            name: format!("District {n}"),
            district_type: BoundaryType::CouncilDistrict,
            geometry,
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

    fn districts(n: u32) -> Vec<NormalizedDistrict> {
        (1..=n).map(district).collect()
    }

    #[test]
    fn test_empty_tree_root() {
        for hash in [HashFunction::Sha256, HashFunction::Poseidon] {
            let tree = MerkleTree::build(vec![], hash).unwrap();
            assert_eq!(tree.root(), hash.empty_root());
            assert!(tree.is_empty());
            assert!(tree.leaves().is_empty());
        }
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let tree = MerkleTree::build(districts(1), HashFunction::Sha256).unwrap();
        assert_eq!(tree.root(), tree.leaves()[0]);
        let proof = tree.prove_inclusion(tree.districts()[0].id()).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(tree.verify_proof(&proof));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut ds = districts(2);
        ds.push(district(1));
        assert!(matches!(
            MerkleTree::build(ds, HashFunction::Sha256),
            Err(MerkleError::DuplicateDistrict(_))
        ));
    }

    #[test]
    fn test_every_leaf_proves_for_odd_sizes() {
        for n in [2, 3, 5, 7, 8, 13] {
            let tree = MerkleTree::build(districts(n), HashFunction::Sha256).unwrap();
            for d in tree.districts() {
                let proof = tree.prove_inclusion(d.id()).unwrap();
                assert!(tree.verify_proof(&proof), "n={n} id={}", d.id());
            }
        }
    }

    #[test]
    fn test_poseidon_tree_proofs() {
        let tree = MerkleTree::build(districts(5), HashFunction::Poseidon).unwrap();
        assert_eq!(tree.hash_function(), HashFunction::Poseidon);
        for d in tree.districts() {
            let proof = tree.prove_inclusion(d.id()).unwrap();
            assert!(tree.verify_proof(&proof));
        }
    }

    #[test]
    fn test_hash_functions_give_different_roots() {
        let sha = MerkleTree::build(districts(3), HashFunction::Sha256).unwrap();
        let pos = MerkleTree::build(districts(3), HashFunction::Poseidon).unwrap();
        assert_ne!(sha.root(), pos.root());
    }

    #[test]
    fn test_bit_flips_fail_verification() {
        let tree = MerkleTree::build(districts(6), HashFunction::Sha256).unwrap();
        let proof = tree.prove_inclusion(tree.districts()[2].id()).unwrap();

        for bit in [0, 7, 100, 255] {
            let mut p = proof.clone();
            p.leaf = p.leaf.with_bit_flipped(bit);
            assert!(!tree.verify_proof(&p));

            let mut p = proof.clone();
            p.root = p.root.with_bit_flipped(bit);
            assert!(!tree.verify_proof(&p));

            for i in 0..proof.siblings.len() {
                let mut p = proof.clone();
                p.siblings[i] = p.siblings[i].with_bit_flipped(bit);
                assert!(!tree.verify_proof(&p));
            }
        }
    }

    #[test]
    fn test_unknown_district_has_no_proof() {
        let tree = MerkleTree::build(districts(3), HashFunction::Sha256).unwrap();
        let id = DistrictId::parse("us-wa-seattle-99").unwrap();
        assert!(tree.prove_inclusion(&id).is_none());
    }

    #[test]
    fn test_layers_shape() {
        let tree = MerkleTree::build(districts(5), HashFunction::Sha256).unwrap();
        let sizes: Vec<usize> = tree.layers().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 3, 2, 1]);
    }

    proptest! {
        #[test]
        fn prop_root_independent_of_input_order(seed in any::<u64>(), n in 1u32..12) {
            let ordered = districts(n);
            let mut shuffled = ordered.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }

            let a = MerkleTree::build(ordered, HashFunction::Sha256).unwrap();
            let b = MerkleTree::build(shuffled, HashFunction::Sha256).unwrap();
            prop_assert_eq!(a.root(), b.root());
            prop_assert_eq!(a.leaves(), b.leaves());
        }
    }
}

//! Merkle inclusion proofs and their JSON wire format.
//!
//! Wire shape (version [`PROOF_FORMAT_VERSION`]):
//!
//! ```json
//! { "root": "<hex>", "leaf": "<hex>", "siblings": ["<hex>", ...], "districtId": "us-wa-seattle-1" }
//! ```
//!
//! Siblings are ordered leaf-to-root. At every step the running digest and
//! the sibling are hashed as a sorted pair, which is why no left/right bits
//! are carried. Changing either rule requires a new format version.

use boundary_atlas_core::{Digest, HashFunction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the sibling-order and sorted-pair convention.
pub const PROOF_FORMAT_VERSION: u32 = 1;

/// Deepest proof accepted: far beyond any realistic leaf count.
pub const MAX_PROOF_DEPTH: usize = 64;

/// An inclusion proof for one district leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub root: Digest,
    pub leaf: Digest,
    pub siblings: Vec<Digest>,
    pub district_id: String,
}

/// Why a proof is malformed, as opposed to merely not verifying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofStructureError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("{field}: invalid hex digest: {reason}")]
    InvalidDigest { field: String, reason: String },

    #[error("{field}: not a canonical field element")]
    NonCanonicalFieldElement { field: String },

    #[error("too many siblings: {count} > {max}")]
    TooManySiblings { count: usize, max: usize },

    #[error("empty district id")]
    EmptyDistrictId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProof {
    root: String,
    leaf: String,
    siblings: Vec<String>,
    district_id: String,
}

impl MerkleProof {
    /// Check everything about the proof except whether it recomputes to
    /// the root.
    pub fn check_structure(&self, hash: HashFunction) -> Result<(), ProofStructureError> {
        if self.district_id.is_empty() {
            return Err(ProofStructureError::EmptyDistrictId);
        }
        if self.siblings.len() > MAX_PROOF_DEPTH {
            return Err(ProofStructureError::TooManySiblings {
                count: self.siblings.len(),
                max: MAX_PROOF_DEPTH,
            });
        }

        let digests = [("root".to_string(), &self.root), ("leaf".to_string(), &self.leaf)]
            .into_iter()
            .chain(
                self.siblings
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (format!("siblings[{i}]"), s)),
            );
        for (field, digest) in digests {
            if !hash.is_canonical_digest(digest) {
                return Err(ProofStructureError::NonCanonicalFieldElement { field });
            }
        }
        Ok(())
    }

    /// Parse the wire format, reporting which field is malformed.
    pub fn from_json(json: &str) -> Result<Self, ProofStructureError> {
        let wire: WireProof =
            serde_json::from_str(json).map_err(|e| ProofStructureError::Json(e.to_string()))?;

        let parse = |field: String, hex: &str| {
            Digest::from_hex(hex).map_err(|e| ProofStructureError::InvalidDigest {
                field,
                reason: e.to_string(),
            })
        };

        let root = parse("root".into(), &wire.root)?;
        let leaf = parse("leaf".into(), &wire.leaf)?;
        let siblings = wire
            .siblings
            .iter()
            .enumerate()
            .map(|(i, s)| parse(format!("siblings[{i}]"), s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root,
            leaf,
            siblings,
            district_id: wire.district_id,
        })
    }

    pub fn to_json(&self) -> String {
        // Serializing digests and strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Recompute the root from `leaf` and `siblings` and compare to `root`.
///
/// Never panics: any hashing failure or oversized proof yields `false`.
pub fn verify_proof(proof: &MerkleProof, hash: HashFunction) -> bool {
    if proof.siblings.len() > MAX_PROOF_DEPTH {
        return false;
    }
    let mut acc = proof.leaf;
    for sibling in &proof.siblings {
        acc = match hash.hash_pair(&acc, sibling) {
            Ok(d) => d,
            Err(_) => return false,
        };
    }
    acc == proof.root
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_core::sha256;

    fn two_leaf_proof() -> MerkleProof {
        let hash = HashFunction::Sha256;
        let a = hash.hash_leaf(b"a").unwrap();
        let b = hash.hash_leaf(b"b").unwrap();
        MerkleProof {
            root: hash.hash_pair(&a, &b).unwrap(),
            leaf: a,
            siblings: vec![b],
            district_id: "us-wa-seattle-1".into(),
        }
    }

    #[test]
    fn test_verify_two_leaf_proof() {
        assert!(verify_proof(&two_leaf_proof(), HashFunction::Sha256));
        assert!(!verify_proof(&two_leaf_proof(), HashFunction::Poseidon));
    }

    #[test]
    fn test_json_wire_shape() {
        let proof = two_leaf_proof();
        let json = proof.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("districtId").is_some());
        assert!(value["root"].is_string());
        assert!(value["siblings"].is_array());
        assert_eq!(MerkleProof::from_json(&json).unwrap(), proof);
    }

    #[test]
    fn test_from_json_reports_bad_field() {
        let json = r#"{"root":"00","leaf":"00","siblings":[],"districtId":"x"}"#;
        match MerkleProof::from_json(json) {
            Err(ProofStructureError::InvalidDigest { field, .. }) => assert_eq!(field, "root"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            MerkleProof::from_json("not json"),
            Err(ProofStructureError::Json(_))
        ));
    }

    #[test]
    fn test_check_structure() {
        let mut proof = two_leaf_proof();
        assert!(proof.check_structure(HashFunction::Sha256).is_ok());

        proof.siblings = vec![sha256(b"x"); MAX_PROOF_DEPTH + 1];
        assert!(matches!(
            proof.check_structure(HashFunction::Sha256),
            Err(ProofStructureError::TooManySiblings { .. })
        ));
        assert!(!verify_proof(&proof, HashFunction::Sha256));

        let mut proof = two_leaf_proof();
        proof.leaf = Digest::from_bytes([0xff; 32]);
        assert!(matches!(
            proof.check_structure(HashFunction::Poseidon),
            Err(ProofStructureError::NonCanonicalFieldElement { .. })
        ));

        let mut proof = two_leaf_proof();
        proof.district_id.clear();
        assert_eq!(
            proof.check_structure(HashFunction::Sha256),
            Err(ProofStructureError::EmptyDistrictId)
        );
    }
}

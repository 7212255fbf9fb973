//! Client-side inclusion proof verification with a typed verdict.
//!
//! [`verify_proof`](boundary_atlas_merkle::verify_proof) answers yes or
//! no. Auditors also need to know *why* a proof failed, so the structural
//! check runs first and a wrong root is told apart from a bad path.

use boundary_atlas_core::{Digest, HashFunction};
use boundary_atlas_merkle::{verify_proof, MerkleProof, ProofStructureError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum ProofVerdict {
    Valid,
    /// Well formed, but for a different commitment.
    RootMismatch { expected: Digest, claimed: Digest },
    /// Well formed, but the path does not recompute to the root.
    Invalid,
    Malformed { reason: String },
}

impl ProofVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ProofVerdict::Valid)
    }
}

impl From<ProofStructureError> for ProofVerdict {
    fn from(err: ProofStructureError) -> Self {
        ProofVerdict::Malformed {
            reason: err.to_string(),
        }
    }
}

/// Check a proof against the root a client trusts.
pub fn check_inclusion(proof: &MerkleProof, trusted_root: &Digest, hash: HashFunction) -> ProofVerdict {
    if let Err(err) = proof.check_structure(hash) {
        return err.into();
    }
    if proof.root != *trusted_root {
        return ProofVerdict::RootMismatch {
            expected: *trusted_root,
            claimed: proof.root,
        };
    }
    if verify_proof(proof, hash) {
        ProofVerdict::Valid
    } else {
        ProofVerdict::Invalid
    }
}

/// Parse the wire format and check it in one step.
pub fn check_inclusion_json(json: &str, trusted_root: &Digest, hash: HashFunction) -> ProofVerdict {
    match MerkleProof::from_json(json) {
        Ok(proof) => check_inclusion(&proof, trusted_root, hash),
        Err(err) => err.into(),
    }
}

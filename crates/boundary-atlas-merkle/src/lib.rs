//! # Boundary Atlas Merkle
//!
//! Commitments over canonical district leaves.
//!
//! - [`MerkleTree`] sorts districts by id, hashes their canonical leaves and
//!   builds the tree layer by layer (in parallel, with deterministic output).
//! - [`MerkleProof`] is the public wire format: `{root, leaf, siblings,
//!   districtId}`. Siblings run leaf-to-root and each pair is hashed in
//!   sorted order, so no direction bits are needed.
//! - [`Snapshot`] is the immutable publication record for one root.
//!
//! ## Verification
//!
//! [`verify_proof`] never panics and returns `false` for anything that does
//! not recompute to the root. Callers that need to tell a malformed proof
//! from a wrong one run [`MerkleProof::check_structure`] first.

pub mod diff;
pub mod error;
pub mod proof;
pub mod snapshot;
pub mod tree;

pub use diff::{diff_snapshots, SnapshotDiff};
pub use error::{MerkleError, Result};
pub use proof::{verify_proof, MerkleProof, ProofStructureError, MAX_PROOF_DEPTH, PROOF_FORMAT_VERSION};
pub use snapshot::{Snapshot, SnapshotId};
pub use tree::MerkleTree;

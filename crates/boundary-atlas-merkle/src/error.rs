//! Error types for Merkle commitments.

use boundary_atlas_core::{CoreError, DistrictId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("duplicate district id: {0}")]
    DuplicateDistrict(DistrictId),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, MerkleError>;

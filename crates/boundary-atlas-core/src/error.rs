//! Error types for Boundary Atlas Core.

use thiserror::Error;

/// Core errors that can occur while building or decoding committed records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("bbox does not match geometry for {id}: recorded {recorded}, derived {derived}")]
    BboxMismatch {
        id: String,
        recorded: String,
        derived: String,
    },

    #[error("geometry is empty")]
    EmptyGeometry,

    #[error("invalid identifier segment: {0:?}")]
    InvalidIdentifier(String),

    #[error("unknown boundary type: {0}")]
    UnknownBoundaryType(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("hash error: {0}")]
    Hash(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("malformed leaf: {0}")]
    MalformedLeaf(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

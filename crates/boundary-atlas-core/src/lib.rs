//! # Boundary Atlas Core
//!
//! Pure primitives for Boundary Atlas: boundary types, provenance, the
//! canonical leaf encoding, leaf/node hash functions, and the geometry kernel.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`BoundaryType`] - Administrative granularity with a static precision rank
//! - [`DistrictId`] - Deterministic identifier composed from the jurisdiction path
//! - [`NormalizedDistrict`] - The canonical, committed unit
//! - [`ProvenanceMetadata`] - Where and how a boundary was acquired
//! - [`HashFunction`] - SHA-256 or Poseidon, chosen per tree
//!
//! ## Canonicalization
//!
//! Raw boundaries become [`NormalizedDistrict`]s through the [`Canonicalizer`].
//! The leaf encoding is deterministic CBOR with coordinates on a fixed
//! integer grid. See [`canonical`].

pub mod canonical;
pub mod canonicalize;
pub mod crypto;
pub mod district;
pub mod error;
pub mod geometry;
pub mod provenance;
pub mod types;

pub use canonical::{canonical_leaf_bytes, decode_leaf, LeafRecord, COORD_SCALE, LEAF_VERSION};
pub use canonicalize::{
    BatchOutcome, Canonicalizer, CanonicalizerConfig, RawBoundary, Rejection, RejectionReason,
};
pub use crypto::{sha256, Digest, HashFunction};
pub use district::{BoundaryGeometry, DistrictRecord, NormalizedDistrict};
pub use error::{CoreError, Result};
pub use geometry::Bounds;
pub use provenance::{
    AcquisitionMethod, AcquisitionProvenanceMetadata, AuthorityClass, ProvenanceMetadata,
    ValidationSummary,
};
pub use types::{jurisdiction_path, normalize_jurisdiction, BoundaryType, DistrictId};

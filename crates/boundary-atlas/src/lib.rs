//! # Boundary Atlas
//!
//! The unified API for Boundary Atlas: a verifiable registry of political
//! and administrative boundaries that answers "which boundary contains this
//! point?" with a Merkle proof against a published root.
//!
//! ## Overview
//!
//! - **Canonicalization**: raw boundaries become [`NormalizedDistrict`]s with
//!   deterministic ids and leaf encodings
//! - **Admission**: the integrity verifier gates every candidate dataset
//! - **Commitment**: admitted districts are committed as a Merkle-rooted
//!   [`Snapshot`], stored content-addressed, and logged
//! - **Resolution**: coordinates resolve finest tier first against the
//!   active snapshot, optionally with an inclusion proof
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boundary_atlas::{Atlas, AtlasConfig};
//! use boundary_atlas::store::SqliteStore;
//!
//! async fn example() {
//!     let config = AtlasConfig::from_file("atlas.toml").unwrap().merge_env().unwrap();
//!     let store = SqliteStore::open("atlas.db").unwrap();
//!     let atlas = Atlas::open(store, config).await.unwrap();
//!
//!     // let report = atlas.ingest(sources).await.unwrap();
//!
//!     let resolution = atlas.resolve(47.6062, -122.3321, Some("us")).await.unwrap();
//!     println!("{resolution:?}");
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `boundary_atlas::core` - Records, canonical encoding, geometry
//! - `boundary_atlas::merkle` - Trees, proofs, snapshots
//! - `boundary_atlas::resolver` - Point resolution
//! - `boundary_atlas::verify` - Admission checks
//! - `boundary_atlas::store` - Content store and registry

pub mod atlas;
pub mod config;
pub mod dataset;
pub mod error;

// Re-export component crates
pub use boundary_atlas_core as core;
pub use boundary_atlas_merkle as merkle;
pub use boundary_atlas_resolver as resolver;
pub use boundary_atlas_store as store;
pub use boundary_atlas_verify as verify;

pub use atlas::{Atlas, IngestOutcome, IngestReport, SourceDataset, SourceReport};
pub use config::{AtlasConfig, ENV_HASH, ENV_MIN_CONFIDENCE};
pub use dataset::{decode_dataset, encode_dataset};
pub use error::{AtlasError, Result};

// Re-export commonly used types
pub use boundary_atlas_core::{
    BoundaryGeometry, BoundaryType, Digest, DistrictId, HashFunction, NormalizedDistrict,
    RawBoundary,
};
pub use boundary_atlas_merkle::{MerkleProof, Snapshot, SnapshotId};
pub use boundary_atlas_resolver::{BoundaryResolution, ProvenResolution, Resolution};
pub use boundary_atlas_verify::{check_inclusion, AdmissionDecision, ProofVerdict};

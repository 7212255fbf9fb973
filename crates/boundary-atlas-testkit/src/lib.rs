//! # Boundary Atlas Testkit
//!
//! Testing utilities for Boundary Atlas.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Raw boundaries, districts, and whole source datasets for
//!   Seattle council districts nested inside a city and a county
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: Pinned leaf encodings and SHA-256 roots
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical leaf encoding and tree hashing so that
//! any other implementation can check itself against this one:
//!
//! ```rust
//! use boundary_atlas_testkit::vectors::{all_vectors, vector_root};
//!
//! for vector in all_vectors() {
//!     let root = vector_root(&vector);
//!     assert_eq!(root.to_hex(), vector.expected_root);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use boundary_atlas_testkit::generators::grid_districts;
//!
//! proptest! {
//!     #[test]
//!     fn root_ignores_input_order(districts in grid_districts(12)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use boundary_atlas_testkit::fixtures::seattle_council;
//!
//! let fixture = seattle_council(7);
//! assert_eq!(fixture.boundaries.len(), 7);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{district, nested_fixture, seattle_council, square, DatasetFixture, NestedFixture};
pub use generators::grid_districts;
pub use vectors::{all_vectors, verify_all_vectors, vector_root, GoldenVector};

//! # Boundary Atlas Resolver
//!
//! Answers "which committed boundary contains this point?".
//!
//! The [`Resolver`] walks [`BoundaryType`](boundary_atlas_core::BoundaryType)
//! tiers finest to coarsest over the active [`CommittedSnapshot`] and returns
//! the first tier with a match, its precision rank, and a confidence.
//! County is the terminal tier by default; nothing by then is
//! [`Resolution::NotFound`].
//!
//! ## Concurrency
//!
//! Queries are read-only. The active snapshot lives behind
//! [`SnapshotHandle`], an `arc-swap` pointer: publishing a new snapshot is a
//! single atomic store, and queries already running keep the snapshot they
//! loaded.
//!
//! ## Determinism
//!
//! The resolve path never applies a bbox tolerance. Points on a shared edge
//! go to exactly one side (see `boundary_atlas_core::geometry`). Several
//! same-tier matches return the lowest id plus a [`TessellationAnomaly`].

pub mod committed;
pub mod config;
pub mod error;
pub mod index;
pub mod resolver;

pub use committed::{CommittedSnapshot, SnapshotHandle};
pub use config::{AuthorityConfidence, ResolverConfig};
pub use error::{ResolverError, Result};
pub use index::TierIndex;
pub use resolver::{
    resolve_in, BoundaryResolution, ProvenResolution, Resolution, Resolver, TessellationAnomaly,
};

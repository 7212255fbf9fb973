//! Storage traits: content-addressed blobs and the snapshot registry.
//!
//! The facade is storage-agnostic over these two traits. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use boundary_atlas_core::{
    BoundaryType, Bounds, Digest, DistrictId, NormalizedDistrict, ProvenanceMetadata,
    ValidationSummary,
};
use boundary_atlas_merkle::{Snapshot, SnapshotId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, StoredEvent};
use crate::error::Result;

/// Result of inserting a record.
///
/// A different record under an existing id is an error
/// ([`StoreError::Conflict`](crate::StoreError::Conflict)), not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// The identical record already exists (idempotent - not an error).
    AlreadyExists,
}

/// Descriptive fields stored alongside a content blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    /// e.g. `application/x-ndjson`.
    pub media_type: String,
    /// Unix ms.
    pub stored_at: i64,
}

impl ContentMetadata {
    pub fn new(media_type: impl Into<String>, stored_at: i64) -> Self {
        Self {
            media_type: media_type.into(),
            stored_at,
        }
    }
}

/// Registry row for one committed district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictEntry {
    pub snapshot_id: SnapshotId,
    pub district_id: DistrictId,
    pub name: String,
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    /// Leaf digest under the snapshot's hash function.
    pub leaf: Digest,
    pub bbox: Bounds,
    pub provenance: ProvenanceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
}

impl DistrictEntry {
    pub fn new(snapshot_id: &SnapshotId, district: &NormalizedDistrict, leaf: Digest) -> Self {
        Self {
            snapshot_id: snapshot_id.clone(),
            district_id: district.id().clone(),
            name: district.name().to_string(),
            jurisdiction: district.jurisdiction().to_string(),
            district_type: district.district_type(),
            leaf,
            bbox: *district.bbox(),
            provenance: district.provenance().clone(),
            validation: district.validation().cloned(),
        }
    }
}

/// Content-addressed blob storage keyed by SHA-256.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `hash`.
    ///
    /// # Errors
    /// [`StoreError::HashMismatch`](crate::StoreError::HashMismatch) if the
    /// bytes do not hash to `hash`. Nothing is written.
    async fn put(&self, hash: &Digest, bytes: Bytes, metadata: &ContentMetadata) -> Result<InsertResult>;

    async fn get(&self, hash: &Digest) -> Result<Option<Bytes>>;

    async fn metadata(&self, hash: &Digest) -> Result<Option<ContentMetadata>>;

    async fn exists(&self, hash: &Digest) -> Result<bool>;

    /// Returns whether anything was removed.
    async fn delete(&self, hash: &Digest) -> Result<bool>;
}

/// Append-only registry of snapshots, their districts, and the audit log.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Inserting an identical record again returns
///   `AlreadyExists`.
/// - **Conflict detection**: A different record under an existing id is
///   rejected with `StoreError::Conflict`.
/// - **Audit chaining**: `append_event` extends the stored hash chain; the
///   caller never supplies a head.
#[async_trait]
pub trait Registry: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<InsertResult>;

    async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>>;

    /// All snapshots, oldest first (by `created_at`, then id).
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>>;

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Districts
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert entries for one or more snapshots. Returns how many were new.
    async fn insert_districts(&self, entries: &[DistrictEntry]) -> Result<usize>;

    async fn get_district(
        &self,
        snapshot_id: &SnapshotId,
        district_id: &DistrictId,
    ) -> Result<Option<DistrictEntry>>;

    /// Entries of one snapshot, ordered by district id.
    async fn list_districts(&self, snapshot_id: &SnapshotId) -> Result<Vec<DistrictEntry>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit log
    // ─────────────────────────────────────────────────────────────────────────

    async fn append_event(&self, event: &AuditEvent) -> Result<StoredEvent>;

    /// All events, in append order.
    async fn list_events(&self) -> Result<Vec<StoredEvent>>;
}

//! The Atlas: unified API for Boundary Atlas.
//!
//! The Atlas brings together canonicalization, admission, commitment,
//! storage, and resolution:
//!
//! ```text
//! SourceDataset -> Canonicalizer -> IntegrityVerifier -> MerkleTree
//!               -> ContentStore + Registry -> SnapshotHandle::swap
//! ```
//!
//! Queries never wait on ingestion: they read whatever snapshot is active
//! when they start.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use boundary_atlas_core::{
    normalize_jurisdiction, sha256, BoundaryGeometry, BoundaryType, Canonicalizer, Digest,
    DistrictId, NormalizedDistrict, RawBoundary, Rejection, RejectionReason,
};
use boundary_atlas_merkle::{diff_snapshots, MerkleTree, Snapshot, SnapshotDiff, SnapshotId};
use boundary_atlas_resolver::{
    CommittedSnapshot, ProvenResolution, Resolution, Resolver, SnapshotHandle,
};
use boundary_atlas_store::{
    verify_chain, AuditEvent, AuditEventKind, ContentMetadata, ContentStore, DistrictEntry,
    Registry, StoreError, StoredEvent,
};
use boundary_atlas_verify::{
    AdmissionDecision, CandidateDataset, Finding, IntegrityVerifier, ReasonCode,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AtlasConfig;
use crate::dataset::{decode_dataset, encode_dataset, DATASET_MEDIA_TYPE};
use crate::error::{AtlasError, Result};

/// One acquisition for one jurisdiction and tier, as handed to
/// [`Atlas::ingest`].
#[derive(Debug, Clone)]
pub struct SourceDataset {
    /// Jurisdiction path, e.g. `us/wa/seattle`. Normalized on ingestion,
    /// so `US/WA/Seattle` names the same jurisdiction.
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    pub boundaries: Vec<RawBoundary>,
    /// Raw response body; every boundary's provenance must hash it.
    pub payload: Bytes,
    pub jurisdiction_boundary: Option<BoundaryGeometry>,
    /// The same jurisdiction and tier from an independent source.
    pub secondary: Option<Vec<RawBoundary>>,
}

impl SourceDataset {
    pub fn new(
        jurisdiction: impl Into<String>,
        district_type: BoundaryType,
        boundaries: Vec<RawBoundary>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            district_type,
            boundaries,
            payload: payload.into(),
            jurisdiction_boundary: None,
            secondary: None,
        }
    }

    pub fn with_jurisdiction_boundary(mut self, boundary: BoundaryGeometry) -> Self {
        self.jurisdiction_boundary = Some(boundary);
        self
    }

    pub fn with_secondary(mut self, secondary: Vec<RawBoundary>) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

/// What happened to one source during ingestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    /// Boundaries the canonicalizer refused before verification.
    pub canonicalization_rejections: Vec<Rejection>,
    pub decision: AdmissionDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestOutcome {
    /// A new snapshot was committed and activated.
    Committed,
    /// Admitted data reproduced the active root; nothing was written.
    Unchanged,
    /// No source was admissible.
    NothingAdmitted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub sources: Vec<SourceReport>,
    /// The active snapshot after ingestion.
    pub snapshot: Option<Snapshot>,
}

impl IngestReport {
    pub fn is_committed(&self) -> bool {
        self.outcome == IngestOutcome::Committed
    }

    /// Districts admitted across all admissible sources.
    pub fn admitted_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.decision.admissible)
            .map(|s| s.decision.admitted.len())
            .sum()
    }
}

/// The main Atlas struct.
///
/// Provides a unified API for:
/// - Ingesting and verifying candidate datasets
/// - Committing admitted districts as Merkle-rooted snapshots
/// - Resolving coordinates, with or without inclusion proofs
/// - Reloading and auditing stored snapshots
pub struct Atlas<S: ContentStore + Registry> {
    store: Arc<S>,
    config: AtlasConfig,
    canonicalizer: Canonicalizer,
    verifier: IntegrityVerifier,
    resolver: Resolver,
    /// Serializes commits. Readers never take it.
    commit_lock: Mutex<()>,
}

impl<S: ContentStore + Registry> Atlas<S> {
    /// Create an Atlas with no active snapshot.
    pub fn new(store: S, config: AtlasConfig) -> Self {
        let canonicalizer = Canonicalizer::new(config.canonicalizer.clone());
        let verifier = IntegrityVerifier::new(
            config.verifier.clone(),
            Arc::new(config.expected_counts.clone()),
        );
        let resolver = Resolver::new(Arc::new(SnapshotHandle::new()), config.resolver.clone());
        Self {
            store: Arc::new(store),
            config,
            canonicalizer,
            verifier,
            resolver,
            commit_lock: Mutex::new(()),
        }
    }

    /// Create an Atlas and activate the latest stored snapshot, if any.
    ///
    /// The stored dataset is rebuilt and must reproduce the recorded root.
    pub async fn open(store: S, config: AtlasConfig) -> Result<Self> {
        let atlas = Self::new(store, config);
        if let Some(latest) = atlas.store.latest_snapshot().await? {
            let committed = atlas.load_snapshot(&latest.id).await?;
            atlas.resolver.handle().swap(committed);
            info!(snapshot = %latest.id, "restored latest snapshot");
        }
        Ok(atlas)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// The pure query front end over the active snapshot.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────

    /// Canonicalize, verify, and commit a batch of sources.
    ///
    /// Admissible sources replace the active snapshot's districts for their
    /// jurisdiction and tier; everything else carries over. The result is
    /// committed as one new snapshot superseding the active one.
    ///
    /// # Errors
    /// [`AtlasError::DuplicateSource`] if two sources share a jurisdiction
    /// and tier, checked before anything is admitted or audited.
    pub async fn ingest(&self, sources: Vec<SourceDataset>) -> Result<IngestReport> {
        let _guard = self.commit_lock.lock().await;
        let sources = normalize_sources(sources)?;

        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            reports.push(self.admit(source).await?);
        }

        let previous = self.resolver.handle().load();
        let mut merged: BTreeMap<DistrictId, NormalizedDistrict> = previous
            .as_deref()
            .map(|c| {
                c.tree()
                    .districts()
                    .iter()
                    .map(|d| (d.id().clone(), d.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for report in &mut reports {
            if report.decision.admissible {
                self.merge_source(&mut merged, &mut report.decision).await?;
            }
        }

        if !reports.iter().any(|r| r.decision.admissible) {
            info!(sources = reports.len(), "no source admitted");
            return Ok(IngestReport {
                outcome: IngestOutcome::NothingAdmitted,
                sources: reports,
                snapshot: previous.map(|c| c.snapshot().clone()),
            });
        }

        let merged: Vec<NormalizedDistrict> = merged.into_values().collect();
        let hash_function = self.config.hash_function;
        let tree = blocking(move || Ok(MerkleTree::build(merged, hash_function)?)).await?;

        if let Some(active) = previous.as_deref() {
            if active.snapshot().matches_tree(&tree) {
                info!(snapshot = %active.snapshot().id, "admitted data matches active root");
                return Ok(IngestReport {
                    outcome: IngestOutcome::Unchanged,
                    sources: reports,
                    snapshot: Some(active.snapshot().clone()),
                });
            }
        }

        let snapshot = self
            .commit(tree, previous.as_deref().map(CommittedSnapshot::snapshot))
            .await?;
        Ok(IngestReport {
            outcome: IngestOutcome::Committed,
            sources: reports,
            snapshot: Some(snapshot),
        })
    }

    /// Fold one admissible decision into the districts to commit.
    ///
    /// Districts of the decision's jurisdiction and tier are replaced. An
    /// admitted id already held under another jurisdiction or tier is
    /// excluded as a duplicate; if none survive, the decision becomes
    /// inadmissible and nothing is replaced.
    async fn merge_source(
        &self,
        merged: &mut BTreeMap<DistrictId, NormalizedDistrict>,
        decision: &mut AdmissionDecision,
    ) -> Result<()> {
        let jurisdiction = decision.jurisdiction.clone();
        let tier = decision.district_type;
        let same_key =
            |d: &NormalizedDistrict| d.jurisdiction() == jurisdiction && d.district_type() == tier;

        let collisions: Vec<(DistrictId, String)> = decision
            .admitted
            .iter()
            .filter_map(|d| {
                let held = merged.get(d.id()).filter(|held| !same_key(held))?;
                Some((
                    d.id().clone(),
                    format!(
                        "id already committed for {} {}",
                        held.jurisdiction(),
                        held.district_type()
                    ),
                ))
            })
            .collect();
        for (id, detail) in collisions {
            let rejection = Rejection {
                label: id.to_string(),
                reason: RejectionReason::Duplication,
                detail: detail.clone(),
            };
            self.audit(AuditEventKind::BoundaryRejected {
                label: rejection.label.clone(),
                reason: rejection.to_string(),
            })
            .await?;
            decision.exclude(Finding::rejection(ReasonCode::IdCollision, detail).for_district(&id));
        }

        if !decision.admissible {
            warn!(%jurisdiction, %tier, "every admitted id collides with another tier");
            return Ok(());
        }
        merged.retain(|_, d| !same_key(d));
        for district in &decision.admitted {
            merged.insert(district.id().clone(), district.clone());
        }
        Ok(())
    }

    /// Canonicalize and verify one source, recording rejections.
    async fn admit(&self, source: SourceDataset) -> Result<SourceReport> {
        let batch = self.canonicalizer.canonicalize_batch(&source.boundaries);
        for rejection in &batch.rejected {
            warn!(label = %rejection.label, reason = ?rejection.reason, "boundary rejected");
            self.audit(AuditEventKind::BoundaryRejected {
                label: rejection.label.clone(),
                reason: rejection.to_string(),
            })
            .await?;
        }

        let mut candidate = CandidateDataset::new(
            source.jurisdiction,
            source.district_type,
            batch.accepted,
            source.payload,
        );
        if let Some(boundary) = source.jurisdiction_boundary {
            candidate = candidate.with_jurisdiction_boundary(boundary);
        }
        if let Some(raws) = source.secondary {
            let secondary = self.canonicalizer.canonicalize_batch(&raws);
            debug!(
                accepted = secondary.accepted.len(),
                rejected = secondary.rejected.len(),
                "canonicalized secondary source"
            );
            candidate = candidate.with_secondary(secondary.accepted);
        }

        let verifier = self.verifier.clone();
        let decision = blocking(move || Ok(verifier.verify(&candidate))).await?;

        if decision.admissible {
            for id in &decision.excluded {
                let reasons = decision
                    .issues
                    .iter()
                    .filter(|f| f.district.as_ref() == Some(id))
                    .map(ToString::to_string)
                    .collect();
                self.audit(AuditEventKind::DistrictExcluded {
                    district_id: id.clone(),
                    reasons,
                })
                .await?;
            }
        } else {
            let mut reasons: Vec<String> = decision.issues.iter().map(ToString::to_string).collect();
            if reasons.is_empty() {
                reasons.push(format!(
                    "confidence {} below minimum {}",
                    decision.confidence, self.config.verifier.min_confidence
                ));
            }
            self.audit(AuditEventKind::DatasetRejected {
                jurisdiction: decision.jurisdiction.clone(),
                district_type: decision.district_type,
                confidence: decision.confidence,
                reasons,
            })
            .await?;
        }

        Ok(SourceReport {
            canonicalization_rejections: batch.rejected,
            decision,
        })
    }

    /// Store, register, and activate a freshly built tree.
    async fn commit(&self, tree: MerkleTree, previous: Option<&Snapshot>) -> Result<Snapshot> {
        // 1. Dataset into the content store
        let (pointer, bytes) = encode_dataset(tree.districts())?;
        let now = now_millis();
        self.store
            .put(&pointer, bytes, &ContentMetadata::new(DATASET_MEDIA_TYPE, now))
            .await?;

        // 2. Snapshot and district records
        let created_at = previous.map_or(now, |p| now.max(p.created_at + 1));
        let snapshot = Snapshot::for_tree(
            &tree,
            pointer,
            created_at,
            previous.map(|p| p.id.clone()),
        );
        self.store.insert_snapshot(&snapshot).await?;

        let entries: Vec<DistrictEntry> = tree
            .districts()
            .iter()
            .zip(tree.leaves())
            .map(|(d, leaf)| DistrictEntry::new(&snapshot.id, d, *leaf))
            .collect();
        self.store.insert_districts(&entries).await?;

        self.audit(AuditEventKind::SnapshotCommitted {
            snapshot_id: snapshot.id.clone(),
            merkle_root: snapshot.merkle_root,
            district_count: snapshot.district_count,
            supersedes: snapshot.supersedes.clone(),
        })
        .await?;
        info!(
            snapshot = %snapshot.id,
            root = %snapshot.merkle_root,
            districts = snapshot.district_count,
            "committed snapshot"
        );

        // 3. Atomic swap
        self.activate(CommittedSnapshot::new(snapshot.clone(), tree)?)
            .await?;
        Ok(snapshot)
    }

    async fn activate(&self, committed: CommittedSnapshot) -> Result<()> {
        let snapshot_id = committed.snapshot().id.clone();
        let previous = self.resolver.handle().swap(committed);
        self.audit(AuditEventKind::SnapshotActivated {
            snapshot_id,
            previous: previous.map(|p| p.snapshot().id.clone()),
        })
        .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a coordinate against the active snapshot.
    ///
    /// A same-tier multi-match is appended to the audit log.
    pub async fn resolve(&self, lat: f64, lng: f64, country: Option<&str>) -> Result<Resolution> {
        let resolution = self.resolver.resolve(lat, lng, country);
        if let Some(found) = resolution.found() {
            if let Some(anomaly) = &found.anomaly {
                self.audit(AuditEventKind::TessellationAnomaly {
                    snapshot_id: found.snapshot_id.clone(),
                    district_type: anomaly.tier,
                    lat,
                    lng,
                    candidates: anomaly.candidates.clone(),
                })
                .await?;
            }
        }
        Ok(resolution)
    }

    /// Resolve and attach the inclusion proof, both from one snapshot.
    pub fn resolve_with_proof(&self, lat: f64, lng: f64, country: Option<&str>) -> Option<ProvenResolution> {
        self.resolver.resolve_with_proof(lat, lng, country)
    }

    pub fn active_snapshot(&self) -> Option<Snapshot> {
        self.resolver
            .handle()
            .load()
            .map(|c| c.snapshot().clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stored snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild a stored snapshot from its dataset.
    ///
    /// # Errors
    /// [`AtlasError::RootMismatch`] if the stored dataset does not rebuild
    /// to the published root.
    pub async fn load_snapshot(&self, id: &SnapshotId) -> Result<CommittedSnapshot> {
        let snapshot = self
            .store
            .get_snapshot(id)
            .await?
            .ok_or_else(|| AtlasError::SnapshotNotFound(id.clone()))?;
        let bytes = self
            .store
            .get(&snapshot.dataset_pointer)
            .await?
            .ok_or_else(|| AtlasError::DatasetMissing {
                id: id.clone(),
                pointer: snapshot.dataset_pointer,
            })?;

        let actual = sha256(&bytes);
        if actual != snapshot.dataset_pointer {
            return Err(StoreError::HashMismatch {
                expected: snapshot.dataset_pointer,
                actual,
            }
            .into());
        }

        let hash_function = snapshot.hash_function;
        let tree = blocking(move || {
            let districts = decode_dataset(&bytes)?;
            Ok(MerkleTree::build(districts, hash_function)?)
        })
        .await?;

        if tree.root() != snapshot.merkle_root {
            return Err(AtlasError::RootMismatch {
                id: snapshot.id,
                recorded: snapshot.merkle_root,
                rebuilt: tree.root(),
            });
        }
        Ok(CommittedSnapshot::new(snapshot, tree)?)
    }

    /// Make a stored snapshot the active one, e.g. to roll back.
    pub async fn activate_snapshot(&self, id: &SnapshotId) -> Result<Snapshot> {
        let _guard = self.commit_lock.lock().await;
        let committed = self.load_snapshot(id).await?;
        let snapshot = committed.snapshot().clone();
        self.activate(committed).await?;
        Ok(snapshot)
    }

    /// Districts added, removed, or changed between two stored snapshots.
    pub async fn diff(&self, old: &SnapshotId, new: &SnapshotId) -> Result<SnapshotDiff> {
        let old = self.load_snapshot(old).await?;
        let new = self.load_snapshot(new).await?;
        Ok(diff_snapshots(old.tree(), new.tree())?)
    }

    /// Recompute the audit chain and return its head.
    pub async fn verify_audit_log(&self) -> Result<Digest> {
        let events = self.store.list_events().await?;
        Ok(verify_chain(&events)?)
    }

    async fn audit(&self, kind: AuditEventKind) -> Result<StoredEvent> {
        Ok(self
            .store
            .append_event(&AuditEvent::new(now_millis(), kind))
            .await?)
    }
}

/// Canonical jurisdiction paths, and at most one source per jurisdiction
/// and tier.
fn normalize_sources(mut sources: Vec<SourceDataset>) -> Result<Vec<SourceDataset>> {
    let mut seen = BTreeSet::new();
    for source in &mut sources {
        source.jurisdiction = normalize_jurisdiction(&source.jurisdiction)?;
        if !seen.insert((source.jurisdiction.clone(), source.district_type)) {
            return Err(AtlasError::DuplicateSource {
                jurisdiction: source.jurisdiction.clone(),
                district_type: source.district_type,
            });
        }
    }
    Ok(sources)
}

/// Run CPU-bound work on the blocking pool.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AtlasError::Task(e.to_string()))?
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn council(jurisdiction: &str) -> SourceDataset {
        SourceDataset::new(jurisdiction, BoundaryType::CouncilDistrict, Vec::new(), Bytes::new())
    }

    #[test]
    fn test_sources_are_normalized_and_keyed_once() {
        let sources = vec![
            council("US/WA/Seattle"),
            SourceDataset::new("us/wa/seattle", BoundaryType::Ward, Vec::new(), Bytes::new()),
        ];
        let normalized = normalize_sources(sources).unwrap();
        assert_eq!(normalized[0].jurisdiction, "us/wa/seattle");

        let err = normalize_sources(vec![council("US/WA/Seattle"), council("us/wa/seattle")])
            .unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateSource { .. }));
        assert!(matches!(
            normalize_sources(vec![council("seattle")]),
            Err(AtlasError::Core(_))
        ));
    }

    #[test]
    fn test_now_millis_is_positive() {
        assert!(now_millis() > 1_700_000_000_000);
    }
}

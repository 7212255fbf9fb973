//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use boundary_atlas_core::{sha256, Digest, DistrictId};
use boundary_atlas_merkle::{Snapshot, SnapshotId};
use bytes::Bytes;

use crate::audit::{AuditChain, AuditEvent, StoredEvent};
use crate::codec;
use crate::error::{Result, StoreError};
use crate::traits::{ContentMetadata, ContentStore, DistrictEntry, InsertResult, Registry};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    content: HashMap<Digest, (Bytes, ContentMetadata)>,

    /// Snapshots with their encoded form, for conflict checks.
    snapshots: HashMap<SnapshotId, (Snapshot, Vec<u8>)>,

    districts: BTreeMap<(SnapshotId, DistrictId), (DistrictEntry, Vec<u8>)>,

    events: Vec<StoredEvent>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, hash: &Digest, bytes: Bytes, metadata: &ContentMetadata) -> Result<InsertResult> {
        let actual = sha256(&bytes);
        if actual != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                actual,
            });
        }

        let mut inner = self.write()?;
        if inner.content.contains_key(hash) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.content.insert(*hash, (bytes, metadata.clone()));
        Ok(InsertResult::Inserted)
    }

    async fn get(&self, hash: &Digest) -> Result<Option<Bytes>> {
        Ok(self.read()?.content.get(hash).map(|(b, _)| b.clone()))
    }

    async fn metadata(&self, hash: &Digest) -> Result<Option<ContentMetadata>> {
        Ok(self.read()?.content.get(hash).map(|(_, m)| m.clone()))
    }

    async fn exists(&self, hash: &Digest) -> Result<bool> {
        Ok(self.read()?.content.contains_key(hash))
    }

    async fn delete(&self, hash: &Digest) -> Result<bool> {
        Ok(self.write()?.content.remove(hash).is_some())
    }
}

#[async_trait]
impl Registry for MemoryStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<InsertResult> {
        let encoded = codec::encode(snapshot)?;
        let mut inner = self.write()?;

        if let Some((_, existing)) = inner.snapshots.get(&snapshot.id) {
            return if *existing == encoded {
                Ok(InsertResult::AlreadyExists)
            } else {
                Err(StoreError::Conflict {
                    kind: "snapshot",
                    id: snapshot.id.to_string(),
                })
            };
        }

        inner
            .snapshots
            .insert(snapshot.id.clone(), (snapshot.clone(), encoded));
        Ok(InsertResult::Inserted)
    }

    async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>> {
        Ok(self.read()?.snapshots.get(id).map(|(s, _)| s.clone()))
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots: Vec<Snapshot> = self
            .read()?
            .snapshots
            .values()
            .map(|(s, _)| s.clone())
            .collect();
        snapshots.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(snapshots)
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        Ok(self.list_snapshots().await?.pop())
    }

    async fn insert_districts(&self, entries: &[DistrictEntry]) -> Result<usize> {
        let encoded = entries
            .iter()
            .map(codec::encode)
            .collect::<Result<Vec<_>>>()?;
        let mut inner = self.write()?;

        // Check everything before writing anything
        for (entry, bytes) in entries.iter().zip(&encoded) {
            let key = (entry.snapshot_id.clone(), entry.district_id.clone());
            if let Some((_, existing)) = inner.districts.get(&key) {
                if existing != bytes {
                    return Err(StoreError::Conflict {
                        kind: "district",
                        id: format!("{}/{}", entry.snapshot_id, entry.district_id),
                    });
                }
            }
        }

        let mut inserted = 0;
        for (entry, bytes) in entries.iter().zip(encoded) {
            let key = (entry.snapshot_id.clone(), entry.district_id.clone());
            if !inner.districts.contains_key(&key) {
                inner.districts.insert(key, (entry.clone(), bytes));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_district(
        &self,
        snapshot_id: &SnapshotId,
        district_id: &DistrictId,
    ) -> Result<Option<DistrictEntry>> {
        let key = (snapshot_id.clone(), district_id.clone());
        Ok(self.read()?.districts.get(&key).map(|(e, _)| e.clone()))
    }

    async fn list_districts(&self, snapshot_id: &SnapshotId) -> Result<Vec<DistrictEntry>> {
        Ok(self
            .read()?
            .districts
            .iter()
            .filter(|((sid, _), _)| sid == snapshot_id)
            .map(|(_, (e, _))| e.clone())
            .collect())
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<StoredEvent> {
        let mut inner = self.write()?;
        let mut chain = AuditChain::after(inner.events.last());
        let stored = chain.append(event.clone())?;
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn list_events(&self) -> Result<Vec<StoredEvent>> {
        Ok(self.read()?.events.clone())
    }
}

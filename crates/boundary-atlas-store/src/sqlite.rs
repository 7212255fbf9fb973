//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boundary_atlas_core::{sha256, Digest, DistrictId};
use boundary_atlas_merkle::{Snapshot, SnapshotId};
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::audit::{AuditChain, AuditEvent, StoredEvent};
use crate::codec;
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentMetadata, ContentStore, DistrictEntry, InsertResult, Registry};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn digest_from_blob(bytes: Vec<u8>) -> Result<Digest> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("digest of {} bytes", b.len())))?;
    Ok(Digest(arr))
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn put(&self, hash: &Digest, bytes: Bytes, metadata: &ContentMetadata) -> Result<InsertResult> {
        let actual = sha256(&bytes);
        if actual != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                actual,
            });
        }

        let hash = *hash;
        let metadata = metadata.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO content (hash, bytes, media_type, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    hash.0.as_slice(),
                    bytes.as_ref(),
                    metadata.media_type,
                    metadata.stored_at
                ],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                debug!(%hash, size = bytes.len(), "stored content");
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get(&self, hash: &Digest) -> Result<Option<Bytes>> {
        let hash = *hash;
        self.run(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT bytes FROM content WHERE hash = ?1",
                    params![hash.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(bytes.map(Bytes::from))
        })
        .await
    }

    async fn metadata(&self, hash: &Digest) -> Result<Option<ContentMetadata>> {
        let hash = *hash;
        self.run(move |conn| {
            conn.query_row(
                "SELECT media_type, stored_at FROM content WHERE hash = ?1",
                params![hash.0.as_slice()],
                |row| {
                    Ok(ContentMetadata {
                        media_type: row.get(0)?,
                        stored_at: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn exists(&self, hash: &Digest) -> Result<bool> {
        let hash = *hash;
        self.run(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM content WHERE hash = ?1",
                    params![hash.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn delete(&self, hash: &Digest) -> Result<bool> {
        let hash = *hash;
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM content WHERE hash = ?1",
                params![hash.0.as_slice()],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}

#[async_trait]
impl Registry for SqliteStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<InsertResult> {
        let snapshot = snapshot.clone();
        let record = codec::encode(&snapshot)?;

        self.run(move |conn| {
            let existing: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM snapshots WHERE snapshot_id = ?1",
                    params![snapshot.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                return if existing == record {
                    Ok(InsertResult::AlreadyExists)
                } else {
                    Err(StoreError::Conflict {
                        kind: "snapshot",
                        id: snapshot.id.to_string(),
                    })
                };
            }

            conn.execute(
                "INSERT INTO snapshots (
                    snapshot_id, merkle_root, district_count, hash_function,
                    created_at, supersedes, record
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    snapshot.id.as_str(),
                    snapshot.merkle_root.0.as_slice(),
                    snapshot.district_count as i64,
                    snapshot.hash_function.code(),
                    snapshot.created_at,
                    snapshot.supersedes.as_ref().map(SnapshotId::as_str),
                    record,
                ],
            )?;

            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>> {
        let id = id.clone();
        self.run(move |conn| {
            let record: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM snapshots WHERE snapshot_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            record.map(|r| codec::decode(&r)).transpose()
        })
        .await
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare("SELECT record FROM snapshots ORDER BY created_at, snapshot_id")?;
            let records = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            records.iter().map(|r| codec::decode(r)).collect()
        })
        .await
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        self.run(|conn| {
            let record: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM snapshots
                     ORDER BY created_at DESC, snapshot_id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            record.map(|r| codec::decode(&r)).transpose()
        })
        .await
    }

    async fn insert_districts(&self, entries: &[DistrictEntry]) -> Result<usize> {
        let rows = entries
            .iter()
            .map(|e| Ok((e.clone(), codec::encode(e)?)))
            .collect::<Result<Vec<_>>>()?;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;

            for (entry, record) in &rows {
                let existing: Option<Vec<u8>> = tx
                    .query_row(
                        "SELECT record FROM districts WHERE snapshot_id = ?1 AND district_id = ?2",
                        params![entry.snapshot_id.as_str(), entry.district_id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    Some(existing) if existing == *record => {}
                    Some(_) => {
                        return Err(StoreError::Conflict {
                            kind: "district",
                            id: format!("{}/{}", entry.snapshot_id, entry.district_id),
                        });
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO districts (
                                snapshot_id, district_id, district_type, jurisdiction, leaf, record
                            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                            params![
                                entry.snapshot_id.as_str(),
                                entry.district_id.as_str(),
                                entry.district_type.code(),
                                entry.jurisdiction,
                                entry.leaf.0.as_slice(),
                                record,
                            ],
                        )?;
                        inserted += 1;
                    }
                }
            }

            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn get_district(
        &self,
        snapshot_id: &SnapshotId,
        district_id: &DistrictId,
    ) -> Result<Option<DistrictEntry>> {
        let (snapshot_id, district_id) = (snapshot_id.clone(), district_id.clone());
        self.run(move |conn| {
            let record: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM districts WHERE snapshot_id = ?1 AND district_id = ?2",
                    params![snapshot_id.as_str(), district_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            record.map(|r| codec::decode(&r)).transpose()
        })
        .await
    }

    async fn list_districts(&self, snapshot_id: &SnapshotId) -> Result<Vec<DistrictEntry>> {
        let snapshot_id = snapshot_id.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record FROM districts WHERE snapshot_id = ?1 ORDER BY district_id",
            )?;
            let records = stmt
                .query_map(params![snapshot_id.as_str()], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            records.iter().map(|r| codec::decode(r)).collect()
        })
        .await
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<StoredEvent> {
        let event = event.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let last: Option<(i64, Vec<u8>)> = tx
                .query_row(
                    "SELECT seq, head FROM audit_events ORDER BY seq DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let mut chain = match last {
                Some((seq, head)) => AuditChain::resume(digest_from_blob(head)?, seq as u64),
                None => AuditChain::new(),
            };

            let canonical = event.canonical_bytes()?;
            let stored = chain.append(event)?;
            tx.execute(
                "INSERT INTO audit_events (seq, at, head, event) VALUES (?1, ?2, ?3, ?4)",
                params![
                    stored.seq as i64,
                    stored.event.at,
                    stored.head.0.as_slice(),
                    canonical,
                ],
            )?;
            tx.commit()?;

            Ok(stored)
        })
        .await
    }

    async fn list_events(&self) -> Result<Vec<StoredEvent>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT seq, head, event FROM audit_events ORDER BY seq")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(seq, head, event)| {
                    Ok(StoredEvent {
                        seq: seq as u64,
                        event: codec::decode(&event)?,
                        head: digest_from_blob(head)?,
                    })
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{verify_chain, AuditEventKind};
    use crate::test_support::{entry, snapshot};

    #[tokio::test]
    async fn test_content_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let bytes = Bytes::from_static(b"{\"districtId\":\"us-wa-seattle-1\"}\n");
        let hash = sha256(&bytes);
        let meta = ContentMetadata::new("application/x-ndjson", 42);

        assert_eq!(store.put(&hash, bytes.clone(), &meta).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.put(&hash, bytes.clone(), &meta).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get(&hash).await.unwrap(), Some(bytes));
        assert_eq!(store.metadata(&hash).await.unwrap(), Some(meta));
        assert!(store.exists(&hash).await.unwrap());

        assert!(store.delete(&hash).await.unwrap());
        assert!(!store.exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_content_rejects_wrong_hash() {
        let store = SqliteStore::open_memory().unwrap();
        let meta = ContentMetadata::new("application/octet-stream", 0);
        let err = store
            .put(&sha256(b"a"), Bytes::from_static(b"b"), &meta)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_conflict() {
        let store = SqliteStore::open_memory().unwrap();
        let snap = snapshot(1_000, b"root");

        assert_eq!(store.insert_snapshot(&snap).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.insert_snapshot(&snap).await.unwrap(), InsertResult::AlreadyExists);
        assert_eq!(store.get_snapshot(&snap.id).await.unwrap(), Some(snap.clone()));

        let mut altered = snap.clone();
        altered.regions.push("us/or".into());
        assert!(matches!(
            store.insert_snapshot(&altered).await,
            Err(StoreError::Conflict { kind: "snapshot", .. })
        ));
    }

    #[tokio::test]
    async fn test_latest_snapshot() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.latest_snapshot().await.unwrap().is_none());

        let old = snapshot(1_000, b"old");
        let new = snapshot(2_000, b"new");
        store.insert_snapshot(&new).await.unwrap();
        store.insert_snapshot(&old).await.unwrap();

        assert_eq!(store.latest_snapshot().await.unwrap(), Some(new.clone()));
        assert_eq!(store.list_snapshots().await.unwrap(), vec![old, new]);
    }

    #[tokio::test]
    async fn test_districts_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let sid = SnapshotId::new("snap-1");
        let entries = vec![entry(&sid, "2"), entry(&sid, "1")];

        assert_eq!(store.insert_districts(&entries).await.unwrap(), 2);
        assert_eq!(store.insert_districts(&entries).await.unwrap(), 0);

        let listed = store.list_districts(&sid).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].district_id.as_str(), "us-wa-seattle-1");

        let one = store
            .get_district(&sid, &entries[0].district_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one, entries[0]);

        assert!(store
            .list_districts(&SnapshotId::new("snap-2"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_district_conflict_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let sid = SnapshotId::new("snap-1");
        store.insert_districts(&[entry(&sid, "1")]).await.unwrap();

        let mut changed = entry(&sid, "1");
        changed.leaf = sha256(b"different");
        let err = store
            .insert_districts(&[entry(&sid, "2"), changed])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { kind: "district", .. }));
        assert_eq!(store.list_districts(&sid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_chain_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            for i in 0..2 {
                let event = AuditEvent::new(
                    i,
                    AuditEventKind::SnapshotActivated {
                        snapshot_id: SnapshotId::new(format!("snap-{i}")),
                        previous: None,
                    },
                );
                store.append_event(&event).await.unwrap();
            }
        }

        let store = SqliteStore::open(&path).unwrap();
        let third = store
            .append_event(&AuditEvent::new(
                9,
                AuditEventKind::TessellationAnomaly {
                    snapshot_id: SnapshotId::new("snap-1"),
                    district_type: boundary_atlas_core::BoundaryType::CouncilDistrict,
                    lat: 47.6,
                    lng: -122.3,
                    candidates: vec![],
                },
            ))
            .await
            .unwrap();
        assert_eq!(third.seq, 3);

        let events = store.list_events().await.unwrap();
        assert_eq!(verify_chain(&events).unwrap(), third.head);
    }
}

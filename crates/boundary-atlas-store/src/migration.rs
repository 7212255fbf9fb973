//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that transforms the schema from version N
//! to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Content-addressed blobs (serialized datasets)
        CREATE TABLE content (
            hash BLOB PRIMARY KEY,            -- 32 bytes, SHA-256 of bytes
            bytes BLOB NOT NULL,
            media_type TEXT NOT NULL,
            stored_at INTEGER NOT NULL        -- Unix ms
        );

        -- Published snapshots; never updated or deleted
        CREATE TABLE snapshots (
            snapshot_id TEXT PRIMARY KEY,
            merkle_root BLOB NOT NULL,        -- 32 bytes
            district_count INTEGER NOT NULL,
            hash_function TEXT NOT NULL,      -- HashFunction code
            created_at INTEGER NOT NULL,      -- Unix ms
            supersedes TEXT,
            record BLOB NOT NULL              -- CBOR of the full snapshot
        );

        -- Committed districts per snapshot
        CREATE TABLE districts (
            snapshot_id TEXT NOT NULL,
            district_id TEXT NOT NULL,
            district_type TEXT NOT NULL,      -- BoundaryType code
            jurisdiction TEXT NOT NULL,
            leaf BLOB NOT NULL,               -- 32 bytes
            record BLOB NOT NULL,             -- CBOR of the full entry
            PRIMARY KEY (snapshot_id, district_id)
        );

        -- Hash-chained audit log
        CREATE TABLE audit_events (
            seq INTEGER PRIMARY KEY,          -- 1-based, contiguous
            at INTEGER NOT NULL,              -- Unix ms
            head BLOB NOT NULL,               -- 32 bytes, chain head after this event
            event BLOB NOT NULL               -- CBOR of the event
        );

        CREATE TRIGGER snapshots_no_update BEFORE UPDATE ON snapshots
        BEGIN SELECT RAISE(ABORT, 'snapshots are append-only'); END;
        CREATE TRIGGER snapshots_no_delete BEFORE DELETE ON snapshots
        BEGIN SELECT RAISE(ABORT, 'snapshots are append-only'); END;
        CREATE TRIGGER districts_no_update BEFORE UPDATE ON districts
        BEGIN SELECT RAISE(ABORT, 'districts are append-only'); END;
        CREATE TRIGGER districts_no_delete BEFORE DELETE ON districts
        BEGIN SELECT RAISE(ABORT, 'districts are append-only'); END;
        CREATE TRIGGER audit_events_no_update BEFORE UPDATE ON audit_events
        BEGIN SELECT RAISE(ABORT, 'audit log is append-only'); END;
        CREATE TRIGGER audit_events_no_delete BEFORE DELETE ON audit_events
        BEGIN SELECT RAISE(ABORT, 'audit log is append-only'); END;

        CREATE INDEX idx_snapshots_created ON snapshots(created_at, snapshot_id);
        CREATE INDEX idx_districts_type ON districts(snapshot_id, district_type);
        CREATE INDEX idx_districts_jurisdiction ON districts(jurisdiction);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["content", "snapshots", "districts", "audit_events", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_audit_log_rejects_update() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO audit_events (seq, at, head, event) VALUES (1, 0, x'00', x'00')",
            [],
        )
        .unwrap();

        assert!(conn.execute("UPDATE audit_events SET at = 5", []).is_err());
        assert!(conn.execute("DELETE FROM audit_events", []).is_err());
    }
}

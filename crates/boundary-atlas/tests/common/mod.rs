//! Shared setup for facade integration tests.

#![allow(dead_code)]

use boundary_atlas::store::{AuditEventKind, MemoryStore, Registry, StoredEvent};
use boundary_atlas::{Atlas, AtlasConfig, SourceDataset};
use boundary_atlas_testkit::fixtures::{seattle_registry, DatasetFixture};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Turn a fixture into the facade's ingestion input.
pub fn source(fixture: DatasetFixture) -> SourceDataset {
    let outline = fixture.outline.clone();
    let source = SourceDataset::new(
        fixture.jurisdiction,
        fixture.district_type,
        fixture.boundaries,
        fixture.payload,
    );
    match outline {
        Some(outline) => source.with_jurisdiction_boundary(outline),
        None => source,
    }
}

/// Config expecting `count` Seattle council districts.
pub fn seattle_config(count: u32) -> AtlasConfig {
    AtlasConfig {
        expected_counts: seattle_registry(count),
        ..AtlasConfig::default()
    }
}

pub fn memory_atlas(config: AtlasConfig) -> Atlas<MemoryStore> {
    init_tracing();
    Atlas::new(MemoryStore::new(), config)
}

/// Every audit event kind, in log order.
pub async fn event_kinds<S: Registry>(store: &S) -> anyhow::Result<Vec<AuditEventKind>> {
    Ok(store
        .list_events()
        .await?
        .into_iter()
        .map(|e: StoredEvent| e.event.kind)
        .collect())
}

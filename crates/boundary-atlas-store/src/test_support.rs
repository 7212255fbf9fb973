//! Record builders for store tests.

use boundary_atlas_core::{
    sha256, AcquisitionMethod, AuthorityClass, BoundaryType, Bounds, DistrictId, HashFunction,
    ProvenanceMetadata,
};
use boundary_atlas_merkle::{Snapshot, SnapshotId};

use crate::traits::DistrictEntry;

pub fn snapshot(created_at: i64, seed: &[u8]) -> Snapshot {
    let root = sha256(seed);
    Snapshot {
        id: SnapshotId::derive(&root, created_at),
        merkle_root: root,
        district_count: 3,
        dataset_pointer: sha256(b"dataset"),
        regions: vec!["us/wa".into()],
        hash_function: HashFunction::Sha256,
        created_at,
        supersedes: None,
    }
}

pub fn entry(snapshot_id: &SnapshotId, district: &str) -> DistrictEntry {
    DistrictEntry {
        snapshot_id: snapshot_id.clone(),
        district_id: DistrictId::parse(&format!("us-wa-seattle-{district}")).unwrap(),
        name: format!("District {district}"),
        jurisdiction: "us/wa/seattle".into(),
        district_type: BoundaryType::CouncilDistrict,
        leaf: sha256(district.as_bytes()),
        bbox: Bounds::new(-122.44, 47.49, -122.23, 47.74),
        provenance: ProvenanceMetadata::for_payload(
            "https://gis.seattle.gov/council/FeatureServer/0",
            AuthorityClass::Municipal,
            1_736_870_400_000,
            AcquisitionMethod::ArcgisRest,
            b"{}",
            200,
            7,
            "esriGeometryPolygon",
        ),
        validation: None,
    }
}

//! Shared builders for unit tests.

use boundary_atlas_core::{
    AcquisitionMethod, AuthorityClass, BoundaryGeometry, BoundaryType, Canonicalizer,
    NormalizedDistrict, ProvenanceMetadata, RawBoundary,
};
use geo::polygon;

use crate::candidate::CandidateDataset;

pub const PAYLOAD: &[u8] = br#"{"type":"FeatureCollection","features":[]}"#;

pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryGeometry {
    BoundaryGeometry::Polygon(
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)],
    )
}

pub fn district_from(payload: &[u8], id: &str, geometry: BoundaryGeometry) -> NormalizedDistrict {
    let raw = RawBoundary {
        country: "us".into(),
        region: "wa".into(),
        locality: Some("seattle".into()),
        district: id.into(),
        name: format!("District {id}"),
        district_type: BoundaryType::CouncilDistrict,
        geometry,
        provenance: ProvenanceMetadata::for_payload(
            "https://gis.seattle.gov/council/FeatureServer/0",
            AuthorityClass::Municipal,
            1_736_870_400_000,
            AcquisitionMethod::ArcgisRest,
            payload,
            200,
            1,
            "esriGeometryPolygon",
        ),
    };
    Canonicalizer::default().canonicalize(&raw).unwrap()
}

pub fn district(id: &str, geometry: BoundaryGeometry) -> NormalizedDistrict {
    district_from(PAYLOAD, id, geometry)
}

pub fn candidate(districts: Vec<NormalizedDistrict>) -> CandidateDataset {
    CandidateDataset::new(
        "us/wa/seattle",
        BoundaryType::CouncilDistrict,
        districts,
        PAYLOAD.to_vec(),
    )
}

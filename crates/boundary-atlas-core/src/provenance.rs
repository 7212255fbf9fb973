//! Provenance: where a boundary came from and how it was admitted.
//!
//! Provenance is immutable once attached to a district. Re-verification
//! produces a new record rather than editing an existing one.

use serde::{Deserialize, Serialize};

use crate::crypto::{sha256, Digest};

/// Class of the authority publishing a boundary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorityClass {
    Federal,
    StateGis,
    Municipal,
    Community,
}

/// How the raw payload was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMethod {
    ArcgisRest,
    Socrata,
    Ckan,
    DirectDownload,
    Manual,
}

/// Coordinate system identifiers accepted as WGS84 decimal degrees.
const WGS84_ALIASES: &[&str] = &[
    "epsg:4326",
    "wgs84",
    "wgs 84",
    "crs84",
    "urn:ogc:def:crs:ogc:1.3:crs84",
    "urn:ogc:def:crs:epsg::4326",
];

/// Acquisition record for a raw boundary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceMetadata {
    /// Source identifier or URL.
    pub source: String,
    pub authority: AuthorityClass,
    /// Acquisition time (Unix ms).
    pub acquired_at: i64,
    pub method: AcquisitionMethod,
    /// SHA-256 of the raw response body.
    pub content_hash: Digest,
    pub http_status: u16,
    pub feature_count: u32,
    /// Geometry type reported by the source (e.g. `esriGeometryPolygon`).
    pub geometry_type: String,
    pub coordinate_system: String,
}

impl ProvenanceMetadata {
    /// Build a record for a payload, hashing it to fill `content_hash`.
    #[allow(clippy::too_many_arguments)]
    pub fn for_payload(
        source: impl Into<String>,
        authority: AuthorityClass,
        acquired_at: i64,
        method: AcquisitionMethod,
        payload: &[u8],
        http_status: u16,
        feature_count: u32,
        geometry_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            authority,
            acquired_at,
            method,
            content_hash: sha256(payload),
            http_status,
            feature_count,
            geometry_type: geometry_type.into(),
            coordinate_system: "EPSG:4326".to_string(),
        }
    }

    /// Whether the declared coordinate system is WGS84 decimal degrees.
    pub fn is_wgs84(&self) -> bool {
        let crs = self.coordinate_system.trim().to_ascii_lowercase();
        WGS84_ALIASES.contains(&crs.as_str())
    }
}

/// Outcome of the validation pass that admitted a district.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// 0-100.
    pub confidence: u8,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Provenance plus the validation outcome that led to admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionProvenanceMetadata {
    pub provenance: ProvenanceMetadata,
    pub validation: ValidationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(crs: &str) -> ProvenanceMetadata {
        let mut p = ProvenanceMetadata::for_payload(
            "https://gis.example.gov/council/FeatureServer/0",
            AuthorityClass::Municipal,
            1_736_870_400_000,
            AcquisitionMethod::ArcgisRest,
            b"{}",
            200,
            7,
            "esriGeometryPolygon",
        );
        p.coordinate_system = crs.to_string();
        p
    }

    #[test]
    fn test_wgs84_aliases() {
        assert!(sample("EPSG:4326").is_wgs84());
        assert!(sample(" wgs84 ").is_wgs84());
        assert!(sample("urn:ogc:def:crs:OGC:1.3:CRS84").is_wgs84());
        assert!(!sample("EPSG:3857").is_wgs84());
        assert!(!sample("EPSG:2926").is_wgs84());
    }

    #[test]
    fn test_for_payload_hashes_body() {
        let p = sample("EPSG:4326");
        assert_eq!(p.content_hash, sha256(b"{}"));
    }
}

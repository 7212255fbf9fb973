//! The canonical committed unit: one validated boundary record.

use geo::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_leaf_bytes;
use crate::crypto::{field_chunks, Digest, HashFunction};
use crate::error::{CoreError, Result};
use crate::geometry::{bounds_of, geometry_contains_point, Bounds};
use crate::provenance::{AcquisitionProvenanceMetadata, ProvenanceMetadata, ValidationSummary};
use crate::types::{BoundaryType, DistrictId};

/// Boundary geometry in WGS84 decimal degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum BoundaryGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl BoundaryGeometry {
    /// Constituent polygons (one for `Polygon`).
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            BoundaryGeometry::Polygon(p) => std::slice::from_ref(p),
            BoundaryGeometry::MultiPolygon(mp) => &mp.0,
        }
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons().to_vec())
    }

    /// Stable kind code used in the canonical leaf.
    pub const fn kind(&self) -> &'static str {
        match self {
            BoundaryGeometry::Polygon(_) => "polygon",
            BoundaryGeometry::MultiPolygon(_) => "multipolygon",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons().is_empty()
    }
}

/// Serialized form of a [`NormalizedDistrict`].
///
/// Deserializing into a district goes through this record so the bbox
/// invariant is re-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRecord {
    pub id: DistrictId,
    pub name: String,
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    pub geometry: BoundaryGeometry,
    pub bbox: Bounds,
    pub provenance: ProvenanceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
}

/// A canonicalized district.
///
/// Fields are private: values come from the canonicalizer or from
/// [`NormalizedDistrict::from_parts`], which re-validates the bbox against
/// the geometry. The bbox is never mutated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistrictRecord", into = "DistrictRecord")]
pub struct NormalizedDistrict {
    id: DistrictId,
    name: String,
    jurisdiction: String,
    district_type: BoundaryType,
    geometry: BoundaryGeometry,
    bbox: Bounds,
    provenance: ProvenanceMetadata,
    validation: Option<ValidationSummary>,
}

impl NormalizedDistrict {
    /// Build from parts, checking that `bbox` is the tight bound of `geometry`.
    pub fn from_parts(
        id: DistrictId,
        name: String,
        jurisdiction: String,
        district_type: BoundaryType,
        geometry: BoundaryGeometry,
        bbox: Bounds,
        provenance: ProvenanceMetadata,
    ) -> Result<Self> {
        let derived = bounds_of(geometry.polygons()).ok_or(CoreError::EmptyGeometry)?;
        if derived != bbox {
            return Err(CoreError::BboxMismatch {
                id: id.to_string(),
                recorded: bbox.to_string(),
                derived: derived.to_string(),
            });
        }
        Ok(Self {
            id,
            name,
            jurisdiction,
            district_type,
            geometry,
            bbox,
            provenance,
            validation: None,
        })
    }

    /// Build with the bbox derived from the geometry.
    pub(crate) fn with_derived_bbox(
        id: DistrictId,
        name: String,
        jurisdiction: String,
        district_type: BoundaryType,
        geometry: BoundaryGeometry,
        provenance: ProvenanceMetadata,
    ) -> Result<Self> {
        let bbox = bounds_of(geometry.polygons()).ok_or(CoreError::EmptyGeometry)?;
        Ok(Self {
            id,
            name,
            jurisdiction,
            district_type,
            geometry,
            bbox,
            provenance,
            validation: None,
        })
    }

    pub fn id(&self) -> &DistrictId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hierarchical jurisdiction path, e.g. `us/wa/seattle`.
    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn district_type(&self) -> BoundaryType {
        self.district_type
    }

    pub fn geometry(&self) -> &BoundaryGeometry {
        &self.geometry
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        self.geometry.polygons()
    }

    pub fn bbox(&self) -> &Bounds {
        &self.bbox
    }

    pub fn provenance(&self) -> &ProvenanceMetadata {
        &self.provenance
    }

    /// Validation outcome recorded at admission, if any.
    pub fn validation(&self) -> Option<&ValidationSummary> {
        self.validation.as_ref()
    }

    /// First segment of the jurisdiction path.
    pub fn country(&self) -> &str {
        self.jurisdiction.split('/').next().unwrap_or_default()
    }

    /// Exact containment: closed bbox prefilter, then half-open
    /// point-in-polygon.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains_point(lon, lat) && geometry_contains_point(self.polygons(), lon, lat)
    }

    /// Deterministic leaf encoding.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_leaf_bytes(self)
    }

    /// Leaf digest under the given hash function.
    pub fn leaf_hash(&self, hash: HashFunction) -> Result<Digest> {
        hash.hash_leaf(&self.canonical_bytes()?)
    }

    /// Field-element chunks of the canonical encoding, as absorbed by the
    /// Poseidon leaf hash. Input for a membership circuit.
    pub fn circuit_witness(&self) -> Result<Vec<[u8; 32]>> {
        Ok(field_chunks(&self.canonical_bytes()?))
    }

    /// A new value carrying the given validation outcome.
    ///
    /// The existing record is left untouched. Leaf bytes do not depend on
    /// validation, so the leaf digest is unchanged.
    pub fn with_validation(&self, validation: ValidationSummary) -> Self {
        Self {
            validation: Some(validation),
            ..self.clone()
        }
    }

    /// Provenance together with the admission outcome, once admitted.
    pub fn acquisition_provenance(&self) -> Option<AcquisitionProvenanceMetadata> {
        self.validation
            .as_ref()
            .map(|validation| AcquisitionProvenanceMetadata {
                provenance: self.provenance.clone(),
                validation: validation.clone(),
            })
    }
}

impl TryFrom<DistrictRecord> for NormalizedDistrict {
    type Error = CoreError;

    fn try_from(record: DistrictRecord) -> Result<Self> {
        let mut district = NormalizedDistrict::from_parts(
            record.id,
            record.name,
            record.jurisdiction,
            record.district_type,
            record.geometry,
            record.bbox,
            record.provenance,
        )?;
        district.validation = record.validation;
        Ok(district)
    }
}

impl From<NormalizedDistrict> for DistrictRecord {
    fn from(d: NormalizedDistrict) -> Self {
        DistrictRecord {
            id: d.id,
            name: d.name,
            jurisdiction: d.jurisdiction,
            district_type: d.district_type,
            geometry: d.geometry,
            bbox: d.bbox,
            provenance: d.provenance,
            validation: d.validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::{AcquisitionMethod, AuthorityClass};
    use geo::polygon;

    fn provenance() -> ProvenanceMetadata {
        ProvenanceMetadata::for_payload(
            "test://seattle",
            AuthorityClass::Municipal,
            1_736_870_400_000,
            AcquisitionMethod::Manual,
            b"payload",
            200,
            1,
            "Polygon",
        )
    }

    fn unit_square() -> BoundaryGeometry {
        BoundaryGeometry::Polygon(
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)],
        )
    }

    fn district() -> NormalizedDistrict {
        NormalizedDistrict::from_parts(
            DistrictId::parse("us-wa-seattle-1").unwrap(),
            "District 1".into(),
            "us/wa/seattle".into(),
            BoundaryType::CouncilDistrict,
            unit_square(),
            Bounds::new(0.0, 0.0, 1.0, 1.0),
            provenance(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_bbox_mismatch() {
        let err = NormalizedDistrict::from_parts(
            DistrictId::parse("us-wa-seattle-1").unwrap(),
            "District 1".into(),
            "us/wa/seattle".into(),
            BoundaryType::CouncilDistrict,
            unit_square(),
            Bounds::new(0.0, 0.0, 2.0, 1.0),
            provenance(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::BboxMismatch { .. }));
    }

    #[test]
    fn test_contains_point() {
        let d = district();
        assert!(d.contains_point(0.5, 0.5));
        assert!(!d.contains_point(1.5, 0.5));
        assert_eq!(d.country(), "us");
    }

    #[test]
    fn test_with_validation_is_new_value_same_leaf() {
        let d = district();
        let admitted = d.with_validation(ValidationSummary {
            confidence: 90,
            issues: vec![],
            warnings: vec!["count off by one".into()],
        });
        assert!(d.validation().is_none());
        assert_eq!(admitted.validation().unwrap().confidence, 90);
        assert_eq!(
            d.leaf_hash(HashFunction::Sha256).unwrap(),
            admitted.leaf_hash(HashFunction::Sha256).unwrap()
        );
        assert!(admitted.acquisition_provenance().is_some());
    }

    #[test]
    fn test_serde_roundtrip_rechecks_bbox() {
        let d = district();
        let json = serde_json::to_string(&d).unwrap();
        let back: NormalizedDistrict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["bbox"]["max_lon"] = serde_json::json!(3.0);
        assert!(serde_json::from_value::<NormalizedDistrict>(value).is_err());
    }

    #[test]
    fn test_circuit_witness_matches_chunking() {
        let d = district();
        let bytes = d.canonical_bytes().unwrap();
        let witness = d.circuit_witness().unwrap();
        assert_eq!(witness.len(), bytes.len().div_ceil(31));
    }
}

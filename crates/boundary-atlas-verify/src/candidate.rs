//! A candidate dataset awaiting admission.

use boundary_atlas_core::{BoundaryGeometry, BoundaryType, NormalizedDistrict};
use bytes::Bytes;

/// Districts from one acquisition, intended to become or update a
/// snapshot, plus everything the checks compare them against.
#[derive(Debug, Clone)]
pub struct CandidateDataset {
    /// Jurisdiction path the districts claim, e.g. `us/wa/seattle`.
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    pub districts: Vec<NormalizedDistrict>,
    /// Raw response body the districts were extracted from.
    pub payload: Bytes,
    /// Outer boundary of the jurisdiction, when known.
    pub jurisdiction_boundary: Option<BoundaryGeometry>,
    /// Districts for the same jurisdiction and tier from an independent
    /// source.
    pub secondary: Option<Vec<NormalizedDistrict>>,
}

impl CandidateDataset {
    pub fn new(
        jurisdiction: impl Into<String>,
        district_type: BoundaryType,
        districts: Vec<NormalizedDistrict>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            district_type,
            districts,
            payload: payload.into(),
            jurisdiction_boundary: None,
            secondary: None,
        }
    }

    pub fn with_jurisdiction_boundary(mut self, boundary: BoundaryGeometry) -> Self {
        self.jurisdiction_boundary = Some(boundary);
        self
    }

    pub fn with_secondary(mut self, secondary: Vec<NormalizedDistrict>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Number of features discovered in the source.
    pub fn discovered_count(&self) -> u32 {
        u32::try_from(self.districts.len()).unwrap_or(u32::MAX)
    }
}

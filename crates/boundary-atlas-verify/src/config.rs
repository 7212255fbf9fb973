//! Verifier configuration and the expected-count registry.
//!
//! The registry is plain immutable data handed to the verifier; nothing
//! here is a global.

use boundary_atlas_core::BoundaryType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Largest |discovered - expected| admitted with a warning.
    pub count_tolerance: u32,
    /// Confidence lost per unit of count drift.
    pub count_penalty_per_unit: u8,
    /// Confidence when the jurisdiction has no expected-count record.
    pub unregistered_count_confidence: u8,
    /// Same-tier overlap at or below this area (m²) is edge rounding.
    pub edge_rounding_area_m2: f64,
    /// Uncovered area (m²) of the jurisdiction above which a gap is reported.
    pub gap_area_threshold_m2: f64,
    /// Fraction of a district's area allowed outside its jurisdiction.
    pub containment_tolerance: f64,
    /// Below this inside fraction a district is from the wrong source.
    pub wrong_source_threshold: f64,
    /// Degrees added to the jurisdiction bbox for the containment prefilter.
    pub bbox_tolerance_deg: f64,
    /// District centroids farther than this from the jurisdiction centroid
    /// are anomalies.
    pub max_centroid_distance_km: f64,
    /// Per-district IoU below which two sources disagree.
    pub cross_source_min_iou: f64,
    /// Confidence lost per warning outside the count check.
    pub warning_penalty: u8,
    /// Minimum composed confidence for admission.
    pub min_confidence: u8,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            count_tolerance: 2,
            count_penalty_per_unit: 10,
            unregistered_count_confidence: 75,
            edge_rounding_area_m2: 1_000.0,
            gap_area_threshold_m2: 10_000.0,
            containment_tolerance: 0.05,
            wrong_source_threshold: 0.5,
            bbox_tolerance_deg: 0.01,
            max_centroid_distance_km: 100.0,
            cross_source_min_iou: 0.9,
            warning_penalty: 5,
            min_confidence: 70,
        }
    }
}

/// Expected number of districts for a jurisdiction and tier.
///
/// Serialized as a number, or `null` for at-large jurisdictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum ExpectedCount {
    Districts(u32),
    /// No geographic sub-districts: one boundary, the whole jurisdiction.
    AtLarge,
}

impl ExpectedCount {
    pub const fn boundaries(&self) -> u32 {
        match self {
            ExpectedCount::Districts(n) => *n,
            ExpectedCount::AtLarge => 1,
        }
    }
}

impl From<Option<u32>> for ExpectedCount {
    fn from(value: Option<u32>) -> Self {
        value.map_or(ExpectedCount::AtLarge, ExpectedCount::Districts)
    }
}

impl From<ExpectedCount> for Option<u32> {
    fn from(value: ExpectedCount) -> Self {
        match value {
            ExpectedCount::Districts(n) => Some(n),
            ExpectedCount::AtLarge => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedCountRecord {
    /// Jurisdiction path, e.g. `us/wa/seattle`.
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    pub expected: ExpectedCount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Expected counts keyed by jurisdiction path and tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ExpectedCountRecord>", into = "Vec<ExpectedCountRecord>")]
pub struct ExpectedCountRegistry {
    entries: BTreeMap<(String, BoundaryType), ExpectedCountRecord>,
}

impl ExpectedCountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a later record for the same key replaces an
    /// earlier one.
    pub fn with(mut self, record: ExpectedCountRecord) -> Self {
        self.entries.insert(
            (record.jurisdiction.clone(), record.district_type),
            record,
        );
        self
    }

    pub fn get(&self, jurisdiction: &str, district_type: BoundaryType) -> Option<&ExpectedCountRecord> {
        self.entries.get(&(jurisdiction.to_string(), district_type))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ExpectedCountRecord>> for ExpectedCountRegistry {
    fn from(records: Vec<ExpectedCountRecord>) -> Self {
        records.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<ExpectedCountRegistry> for Vec<ExpectedCountRecord> {
    fn from(registry: ExpectedCountRegistry) -> Self {
        registry.entries.into_values().collect()
    }
}

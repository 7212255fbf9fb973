//! Typed verification outcomes.
//!
//! Every check reports through the same closed vocabulary: a
//! [`Finding`] has a [`Severity`], a [`ReasonCode`], the district it is
//! about (or none for dataset-level findings), and a numeric magnitude
//! where one exists (overlap area, count delta, inside fraction).

use boundary_atlas_core::DistrictId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a finding affects admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Admitted, flagged for follow-up.
    Anomaly,
    /// Admitted with reduced confidence.
    Warning,
    /// Fatal for the district it names, or for the dataset when it names
    /// none.
    Rejection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    ContentHashMismatch,
    CountDrift,
    CountOutsideTolerance,
    CountUnregistered,
    SelfIntersection,
    CoordinateRange,
    EdgeRoundingOverlap,
    Overlap,
    CoverageGap,
    SuspiciousCentroid,
    CrossSourceCountMismatch,
    CrossSourceGeometryDivergence,
    CrossSourceMissingDistrict,
    ContainmentPartial,
    ContainmentFailure,
    WrongSource,
    MissingJurisdictionBoundary,
    OutOfScope,
    IdCollision,
    EmptyDataset,
}

impl ReasonCode {
    pub const fn code(&self) -> &'static str {
        match self {
            ReasonCode::ContentHashMismatch => "content-hash-mismatch",
            ReasonCode::CountDrift => "count-drift",
            ReasonCode::CountOutsideTolerance => "count-outside-tolerance",
            ReasonCode::CountUnregistered => "count-unregistered",
            ReasonCode::SelfIntersection => "self-intersection",
            ReasonCode::CoordinateRange => "coordinate-range",
            ReasonCode::EdgeRoundingOverlap => "edge-rounding-overlap",
            ReasonCode::Overlap => "overlap",
            ReasonCode::CoverageGap => "coverage-gap",
            ReasonCode::SuspiciousCentroid => "suspicious-centroid",
            ReasonCode::CrossSourceCountMismatch => "cross-source-count-mismatch",
            ReasonCode::CrossSourceGeometryDivergence => "cross-source-geometry-divergence",
            ReasonCode::CrossSourceMissingDistrict => "cross-source-missing-district",
            ReasonCode::ContainmentPartial => "containment-partial",
            ReasonCode::ContainmentFailure => "containment-failure",
            ReasonCode::WrongSource => "wrong-source",
            ReasonCode::MissingJurisdictionBoundary => "missing-jurisdiction-boundary",
            ReasonCode::OutOfScope => "out-of-scope",
            ReasonCode::IdCollision => "id-collision",
            ReasonCode::EmptyDataset => "empty-dataset",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub code: ReasonCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<DistrictId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    pub detail: String,
}

impl Finding {
    pub fn rejection(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self::new(Severity::Rejection, code, detail)
    }

    pub fn warning(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, detail)
    }

    pub fn anomaly(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self::new(Severity::Anomaly, code, detail)
    }

    fn new(severity: Severity, code: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            district: None,
            magnitude: None,
            detail: detail.into(),
        }
    }

    pub fn for_district(mut self, id: &DistrictId) -> Self {
        self.district = Some(id.clone());
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    /// A rejection that names no district rejects the whole dataset.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Rejection && self.district.is_none()
    }

    /// A rejection that excludes one district.
    pub fn excludes_district(&self) -> Option<&DistrictId> {
        match self.severity {
            Severity::Rejection => self.district.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code)?;
        if let Some(id) = &self.district {
            write!(f, " {id}:")?;
        }
        write!(f, " {}", self.detail)?;
        if let Some(m) = self.magnitude {
            write!(f, " ({m})")?;
        }
        Ok(())
    }
}

/// Which check produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    ContentHash,
    Scope,
    BoundaryCount,
    Topology,
    CrossSource,
    Containment,
}

/// Result of one independent check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub kind: CheckKind,
    /// 0-100 confidence this check alone supports.
    pub confidence: u8,
    pub findings: Vec<Finding>,
}

impl CheckOutcome {
    pub fn passed(kind: CheckKind) -> Self {
        Self {
            kind,
            confidence: 100,
            findings: Vec::new(),
        }
    }

    pub fn new(kind: CheckKind, confidence: u8, findings: Vec<Finding>) -> Self {
        Self {
            kind,
            confidence: confidence.min(100),
            findings,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.findings.iter().any(Finding::is_fatal)
    }
}

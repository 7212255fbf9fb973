//! Every district must lie within its jurisdiction's outer boundary.
//!
//! A small outside share is tolerated for simplification artifacts. A
//! district mostly outside is from the wrong source and is excluded; if
//! most of the dataset fails that way, the dataset is rejected.

use boundary_atlas_core::geometry::{area_m2, bounds_of, intersection_area_m2};
use rayon::prelude::*;
use tracing::warn;

use crate::candidate::CandidateDataset;
use crate::checks::penalized;
use crate::config::VerifierConfig;
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode, Severity};

pub fn check_containment(candidate: &CandidateDataset, config: &VerifierConfig) -> CheckOutcome {
    let Some(boundary) = candidate.jurisdiction_boundary.as_ref() else {
        return CheckOutcome::new(
            CheckKind::Containment,
            penalized(1, config.warning_penalty),
            vec![Finding::warning(
                ReasonCode::MissingJurisdictionBoundary,
                format!("no outer boundary for {}; containment not checked", candidate.jurisdiction),
            )],
        );
    };
    let outline = boundary.to_multi_polygon();
    let Some(prefilter) = bounds_of(boundary.polygons()).map(|b| b.expanded(config.bbox_tolerance_deg))
    else {
        return CheckOutcome::new(
            CheckKind::Containment,
            0,
            vec![Finding::rejection(
                ReasonCode::MissingJurisdictionBoundary,
                "jurisdiction boundary is empty",
            )],
        );
    };

    let mut findings: Vec<Finding> = candidate
        .districts
        .par_iter()
        .filter_map(|district| {
            let inside = if district.bbox().intersects(&prefilter) {
                let shape = district.geometry().to_multi_polygon();
                let area = area_m2(&shape);
                if area > 0.0 {
                    (intersection_area_m2(&shape, &outline) / area).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            } else {
                0.0
            };

            if inside >= 1.0 - config.containment_tolerance {
                None
            } else if inside < config.wrong_source_threshold {
                Some(
                    Finding::rejection(
                        ReasonCode::ContainmentFailure,
                        format!(
                            "{:.1}% inside {}; wrong source",
                            inside * 100.0,
                            candidate.jurisdiction
                        ),
                    )
                    .for_district(district.id())
                    .with_magnitude(inside),
                )
            } else {
                Some(
                    Finding::warning(
                        ReasonCode::ContainmentPartial,
                        format!("{:.1}% inside {}", inside * 100.0, candidate.jurisdiction),
                    )
                    .for_district(district.id())
                    .with_magnitude(inside),
                )
            }
        })
        .collect();

    let failures = findings
        .iter()
        .filter(|f| f.severity == Severity::Rejection)
        .count();
    if failures > 0 && failures * 2 > candidate.districts.len() {
        warn!(
            jurisdiction = %candidate.jurisdiction,
            failures,
            total = candidate.districts.len(),
            "most districts fall outside jurisdiction"
        );
        findings.push(
            Finding::rejection(
                ReasonCode::WrongSource,
                format!(
                    "{failures} of {} districts lie outside {}",
                    candidate.districts.len(),
                    candidate.jurisdiction
                ),
            )
            .with_magnitude(failures as f64),
        );
        return CheckOutcome::new(CheckKind::Containment, 0, findings);
    }

    let confidence = penalized(findings.len(), config.warning_penalty);
    CheckOutcome::new(CheckKind::Containment, confidence, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candidate, district, square};

    #[test]
    fn test_all_inside_passes() {
        let c = candidate(vec![district("1", square(0.0, 0.0, 0.01, 0.01))])
            .with_jurisdiction_boundary(square(0.0, 0.0, 0.02, 0.02));
        let out = check_containment(&c, &VerifierConfig::default());
        assert!(out.findings.is_empty());
        assert_eq!(out.confidence, 100);
    }

    #[test]
    fn test_entirely_outside_district_is_excluded() {
        let c = candidate(vec![
            district("1", square(0.0, 0.0, 0.01, 0.01)),
            district("2", square(0.005, 0.0, 0.015, 0.01)),
            district("3", square(1.0, 1.0, 1.01, 1.01)),
        ])
        .with_jurisdiction_boundary(square(0.0, 0.0, 0.02, 0.02));
        let out = check_containment(&c, &VerifierConfig::default());
        assert!(!out.is_fatal());
        let failure = out
            .findings
            .iter()
            .find(|f| f.code == ReasonCode::ContainmentFailure)
            .unwrap();
        assert_eq!(failure.district.as_ref().unwrap().as_str(), "us-wa-seattle-3");
        assert_eq!(failure.magnitude, Some(0.0));
    }

    #[test]
    fn test_mostly_outside_dataset_is_wrong_source() {
        let c = candidate(vec![district("1", square(3.0, 3.0, 3.01, 3.01))])
            .with_jurisdiction_boundary(square(0.0, 0.0, 0.02, 0.02));
        let out = check_containment(&c, &VerifierConfig::default());
        assert!(out.is_fatal());
        assert!(out.findings.iter().any(|f| f.code == ReasonCode::WrongSource));
    }

    #[test]
    fn test_partial_containment_warns() {
        // 70% inside
        let c = candidate(vec![district("1", square(0.0, 0.0, 0.01, 0.01))])
            .with_jurisdiction_boundary(square(0.003, 0.0, 0.02, 0.02));
        let out = check_containment(&c, &VerifierConfig::default());
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].code, ReasonCode::ContainmentPartial);
        assert_eq!(out.findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_boundary_warns() {
        let c = candidate(vec![district("1", square(0.0, 0.0, 0.01, 0.01))]);
        let out = check_containment(&c, &VerifierConfig::default());
        assert_eq!(out.findings[0].code, ReasonCode::MissingJurisdictionBoundary);
        assert!(!out.is_fatal());
    }
}

//! Every district must belong to the candidate's jurisdiction and tier.

use tracing::warn;

use crate::candidate::CandidateDataset;
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode};

/// A district claiming another jurisdiction or tier is excluded; the
/// candidate's key is what a commit replaces.
pub fn check_scope(candidate: &CandidateDataset) -> CheckOutcome {
    let findings: Vec<Finding> = candidate
        .districts
        .iter()
        .filter(|d| {
            d.jurisdiction() != candidate.jurisdiction
                || d.district_type() != candidate.district_type
        })
        .map(|d| {
            Finding::rejection(
                ReasonCode::OutOfScope,
                format!(
                    "belongs to {} {}, candidate is {} {}",
                    d.jurisdiction(),
                    d.district_type(),
                    candidate.jurisdiction,
                    candidate.district_type
                ),
            )
            .for_district(d.id())
        })
        .collect();

    if findings.is_empty() {
        return CheckOutcome::passed(CheckKind::Scope);
    }
    warn!(
        jurisdiction = %candidate.jurisdiction,
        tier = %candidate.district_type,
        out_of_scope = findings.len(),
        "districts outside candidate scope"
    );
    CheckOutcome::new(CheckKind::Scope, 100, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candidate, district, square};
    use boundary_atlas_core::BoundaryType;

    #[test]
    fn test_matching_scope_passes() {
        let c = candidate(vec![district("1", square(0.0, 0.0, 0.01, 0.01))]);
        let out = check_scope(&c);
        assert!(out.findings.is_empty());
        assert_eq!(out.confidence, 100);
    }

    #[test]
    fn test_other_jurisdiction_excluded() {
        let mut c = candidate(vec![district("1", square(0.0, 0.0, 0.01, 0.01))]);
        c.jurisdiction = "US/WA/Seattle".into();
        let out = check_scope(&c);
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].code, ReasonCode::OutOfScope);
        assert_eq!(
            out.findings[0].excludes_district().map(|id| id.as_str()),
            Some("us-wa-seattle-1")
        );
        assert!(!out.is_fatal());
    }

    #[test]
    fn test_other_tier_excluded() {
        let mut c = candidate(vec![
            district("1", square(0.0, 0.0, 0.01, 0.01)),
            district("2", square(0.01, 0.0, 0.02, 0.01)),
        ]);
        c.district_type = BoundaryType::Ward;
        assert_eq!(check_scope(&c).findings.len(), 2);
    }
}

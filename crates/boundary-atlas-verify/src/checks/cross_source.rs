//! Agreement between two independent sources for one jurisdiction and tier.
//!
//! Disagreement lowers confidence and is reported; which source is right
//! is not decided here.

use boundary_atlas_core::geometry::iou;
use boundary_atlas_core::{DistrictId, NormalizedDistrict};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::candidate::CandidateDataset;
use crate::checks::penalized;
use crate::config::VerifierConfig;
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode};

pub fn check_cross_source(candidate: &CandidateDataset, config: &VerifierConfig) -> CheckOutcome {
    let Some(secondary) = candidate.secondary.as_ref() else {
        return CheckOutcome::passed(CheckKind::CrossSource);
    };

    let mut findings = Vec::new();
    let (primary_len, secondary_len) = (candidate.districts.len(), secondary.len());
    if primary_len != secondary_len {
        findings.push(
            Finding::warning(
                ReasonCode::CrossSourceCountMismatch,
                format!("primary has {primary_len} districts, secondary {secondary_len}"),
            )
            .with_magnitude(primary_len.abs_diff(secondary_len) as f64),
        );
    }

    let others: BTreeMap<&DistrictId, &NormalizedDistrict> =
        secondary.iter().map(|d| (d.id(), d)).collect();

    let mut divergent: Vec<Finding> = candidate
        .districts
        .par_iter()
        .filter_map(|district| {
            let Some(other) = others.get(district.id()) else {
                return Some(
                    Finding::warning(
                        ReasonCode::CrossSourceMissingDistrict,
                        "absent from secondary source",
                    )
                    .for_district(district.id()),
                );
            };
            let similarity = iou(
                &district.geometry().to_multi_polygon(),
                &other.geometry().to_multi_polygon(),
            );
            (similarity < config.cross_source_min_iou).then(|| {
                Finding::warning(
                    ReasonCode::CrossSourceGeometryDivergence,
                    format!("IoU with secondary source {similarity:.3}"),
                )
                .for_district(district.id())
                .with_magnitude(similarity)
            })
        })
        .collect();
    divergent.sort_by(|a, b| a.district.cmp(&b.district));
    findings.extend(divergent);

    let primary_ids: Vec<&DistrictId> = candidate.districts.iter().map(|d| d.id()).collect();
    for id in others.keys().filter(|id| !primary_ids.contains(*id)) {
        findings.push(
            Finding::warning(
                ReasonCode::CrossSourceMissingDistrict,
                format!("{id} only present in secondary source"),
            ),
        );
    }

    debug!(
        jurisdiction = %candidate.jurisdiction,
        disagreements = findings.len(),
        "cross-source comparison"
    );
    let confidence = penalized(findings.len(), config.warning_penalty);
    CheckOutcome::new(CheckKind::CrossSource, confidence, findings)
}

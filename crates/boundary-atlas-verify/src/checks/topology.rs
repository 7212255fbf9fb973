//! Topology: per-district validity, same-tier overlap, coverage gaps,
//! coordinate ranges, and centroid sanity.
//!
//! Overlap is judged by absolute geodesic area. A few square metres along
//! a shared edge is rounding; a small percentage of a large county is not.

use boundary_atlas_core::geometry::{
    area_m2, bounds_of, centroid, coordinates_in_range, haversine_km, intersection_area_m2,
    self_intersection_count, union_all,
};
use boundary_atlas_core::NormalizedDistrict;
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::warn;

use crate::candidate::CandidateDataset;
use crate::checks::penalized;
use crate::config::VerifierConfig;
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode, Severity};

/// Overlap at or below this area (m²) is numerical noise, not a finding.
pub const OVERLAP_EPSILON_M2: f64 = 1.0;

pub fn check_topology(candidate: &CandidateDataset, config: &VerifierConfig) -> CheckOutcome {
    let districts = &candidate.districts;
    let shapes: Vec<MultiPolygon<f64>> = districts
        .iter()
        .map(|d| d.geometry().to_multi_polygon())
        .collect();

    let mut findings = Vec::new();

    // 1. Per-district validity
    for district in districts {
        if !coordinates_in_range(district.polygons()) {
            findings.push(
                Finding::rejection(ReasonCode::CoordinateRange, "coordinate outside lon/lat range")
                    .for_district(district.id()),
            );
            continue;
        }
        let crossings: usize = district.polygons().iter().map(self_intersection_count).sum();
        if crossings > 0 {
            findings.push(
                Finding::rejection(ReasonCode::SelfIntersection, "ring self-intersects")
                    .for_district(district.id())
                    .with_magnitude(crossings as f64),
            );
        }
    }

    // 2. Same-tier overlap
    if candidate.district_type.tessellates() {
        findings.extend(overlap_findings(districts, &shapes, config));
    }

    // 3. Coverage gaps
    if let (true, Some(boundary)) = (
        candidate.district_type.tessellates(),
        candidate.jurisdiction_boundary.as_ref(),
    ) {
        let outline = boundary.to_multi_polygon();
        let covered = intersection_area_m2(&outline, &union_all(&shapes));
        let gap = (area_m2(&outline) - covered).max(0.0);
        if gap > config.gap_area_threshold_m2 {
            findings.push(
                Finding::warning(
                    ReasonCode::CoverageGap,
                    format!("{} not covered by any district", candidate.jurisdiction),
                )
                .with_magnitude(gap),
            );
        }
    }

    // 4. Centroid sanity
    let reference = match candidate.jurisdiction_boundary.as_ref() {
        Some(boundary) => centroid(&boundary.to_multi_polygon()).map(|p| (p.x(), p.y())),
        None => {
            let all: Vec<_> = districts.iter().flat_map(|d| d.polygons().iter().cloned()).collect();
            bounds_of(&all).map(|b| b.center())
        }
    };
    if let Some(reference) = reference {
        for (district, shape) in districts.iter().zip(&shapes) {
            let Some(c) = centroid(shape) else { continue };
            let distance = haversine_km((c.x(), c.y()), reference);
            if distance > config.max_centroid_distance_km {
                findings.push(
                    Finding::anomaly(
                        ReasonCode::SuspiciousCentroid,
                        format!("centroid {distance:.1} km from {}", candidate.jurisdiction),
                    )
                    .for_district(district.id())
                    .with_magnitude(distance),
                );
            }
        }
    }

    let confidence = if findings.iter().any(Finding::is_fatal) {
        0
    } else {
        let warnings = findings.iter().filter(|f| f.severity == Severity::Warning).count();
        penalized(warnings, config.warning_penalty)
    };
    CheckOutcome::new(CheckKind::Topology, confidence, findings)
}

fn overlap_findings(
    districts: &[NormalizedDistrict],
    shapes: &[MultiPolygon<f64>],
    config: &VerifierConfig,
) -> Vec<Finding> {
    let pairs: Vec<(usize, usize)> = (0..districts.len())
        .flat_map(|i| ((i + 1)..districts.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| districts[i].bbox().intersects(districts[j].bbox()))
        .collect();

    pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let area = intersection_area_m2(&shapes[i], &shapes[j]);
            if area <= OVERLAP_EPSILON_M2 {
                return None;
            }
            let (a, b) = (districts[i].id(), districts[j].id());
            let finding = if area <= config.edge_rounding_area_m2 {
                Finding::warning(ReasonCode::EdgeRoundingOverlap, format!("overlaps {b}"))
                    .for_district(a)
            } else {
                warn!(%a, %b, area, "same-tier overlap");
                Finding::rejection(ReasonCode::Overlap, format!("{a} overlaps {b}"))
            };
            Some(finding.with_magnitude(area))
        })
        .collect()
}

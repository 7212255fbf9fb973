//! Composing the checks into one admission decision.

use boundary_atlas_core::{BoundaryType, DistrictId, NormalizedDistrict, ValidationSummary};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::candidate::CandidateDataset;
use crate::checks::{
    check_boundary_count, check_containment, check_content_hash, check_cross_source,
    check_scope, check_topology,
};
use crate::config::{ExpectedCountRegistry, VerifierConfig};
use crate::outcome::{CheckOutcome, Finding, ReasonCode, Severity};

/// The gatekeeper's verdict on a candidate dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    /// No dataset-level rejection and at least one district survived.
    pub valid: bool,
    /// 0-100: the lowest confidence any check supports.
    pub confidence: u8,
    /// `valid` and `confidence` at or above the configured minimum.
    pub admissible: bool,
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub anomalies: Vec<Finding>,
    pub checks: Vec<CheckOutcome>,
    /// Surviving districts, each carrying the validation outcome.
    pub admitted: Vec<NormalizedDistrict>,
    pub excluded: Vec<DistrictId>,
    /// District-level rejections by reason.
    pub rejection_tally: BTreeMap<ReasonCode, usize>,
}

impl AdmissionDecision {
    /// Exclude an admitted district after the decision was composed, for
    /// a district-level rejection found outside the checks. A decision
    /// left with no district is neither valid nor admissible.
    ///
    /// Returns `false` if `finding` names no currently admitted district.
    pub fn exclude(&mut self, finding: Finding) -> bool {
        let Some(id) = finding.excludes_district().cloned() else {
            return false;
        };
        let before = self.admitted.len();
        self.admitted.retain(|d| d.id() != &id);
        if self.admitted.len() == before {
            return false;
        }

        warn!(district = %id, code = %finding.code, "excluded after admission");
        if let Err(at) = self.excluded.binary_search(&id) {
            self.excluded.insert(at, id);
        }
        *self.rejection_tally.entry(finding.code).or_default() += 1;
        self.issues.push(finding);
        if self.admitted.is_empty() {
            self.issues.push(Finding::rejection(
                ReasonCode::EmptyDataset,
                "no district survived verification",
            ));
            self.valid = false;
            self.admissible = false;
        }
        true
    }
}

/// Runs every check against a candidate and composes the verdict.
///
/// Checks run concurrently. The decision waits for all of them, except
/// that a content-hash mismatch rejects immediately.
#[derive(Debug, Clone, Default)]
pub struct IntegrityVerifier {
    config: VerifierConfig,
    registry: Arc<ExpectedCountRegistry>,
}

impl IntegrityVerifier {
    pub fn new(config: VerifierConfig, registry: Arc<ExpectedCountRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExpectedCountRegistry {
        &self.registry
    }

    pub fn verify(&self, candidate: &CandidateDataset) -> AdmissionDecision {
        let content = check_content_hash(candidate);
        if content.is_fatal() {
            return self.compose(candidate, vec![content]);
        }
        let scope = check_scope(candidate);

        let config = &self.config;
        let expected = self
            .registry
            .get(&candidate.jurisdiction, candidate.district_type);
        let ((count, topology), (cross, containment)) = rayon::join(
            || {
                rayon::join(
                    || check_boundary_count(candidate.discovered_count(), expected, config),
                    || check_topology(candidate, config),
                )
            },
            || {
                rayon::join(
                    || check_cross_source(candidate, config),
                    || check_containment(candidate, config),
                )
            },
        );

        self.compose(
            candidate,
            vec![content, scope, count, topology, cross, containment],
        )
    }

    fn compose(&self, candidate: &CandidateDataset, checks: Vec<CheckOutcome>) -> AdmissionDecision {
        let findings: Vec<&Finding> = checks.iter().flat_map(|c| c.findings.iter()).collect();
        let by_severity = |severity: Severity| -> Vec<Finding> {
            findings
                .iter()
                .filter(|f| f.severity == severity)
                .map(|f| (*f).clone())
                .collect()
        };
        let mut issues = by_severity(Severity::Rejection);
        let warnings = by_severity(Severity::Warning);
        let anomalies = by_severity(Severity::Anomaly);

        // 1. District-level exclusions
        let mut excluded = BTreeSet::new();
        let mut rejection_tally: BTreeMap<ReasonCode, usize> = BTreeMap::new();
        for finding in &issues {
            if let Some(id) = finding.excludes_district() {
                excluded.insert(id.clone());
                *rejection_tally.entry(finding.code).or_default() += 1;
            }
        }
        for id in &excluded {
            warn!(district = %id, "excluded from candidate dataset");
        }

        // 2. Dataset-level verdict
        let survivors: Vec<&NormalizedDistrict> = candidate
            .districts
            .iter()
            .filter(|d| !excluded.contains(d.id()))
            .collect();
        if survivors.is_empty() {
            issues.push(Finding::rejection(
                ReasonCode::EmptyDataset,
                "no district survived verification",
            ));
        }
        let valid = !issues.iter().any(Finding::is_fatal);
        let confidence = checks.iter().map(|c| c.confidence).min().unwrap_or(0);
        let admissible = valid && confidence >= self.config.min_confidence;

        // 3. Attach the outcome to each survivor as a new value
        let admitted = survivors
            .into_iter()
            .map(|d| {
                let concerns = |f: &&Finding| f.district.as_ref().map_or(true, |id| id == d.id());
                d.with_validation(ValidationSummary {
                    confidence,
                    issues: issues.iter().filter(concerns).map(ToString::to_string).collect(),
                    warnings: warnings
                        .iter()
                        .chain(anomalies.iter())
                        .filter(concerns)
                        .map(ToString::to_string)
                        .collect(),
                })
            })
            .collect();

        info!(
            jurisdiction = %candidate.jurisdiction,
            tier = %candidate.district_type,
            valid,
            admissible,
            confidence,
            issues = issues.len(),
            warnings = warnings.len(),
            anomalies = anomalies.len(),
            excluded = excluded.len(),
            "admission decision"
        );

        AdmissionDecision {
            jurisdiction: candidate.jurisdiction.clone(),
            district_type: candidate.district_type,
            valid,
            confidence,
            admissible,
            issues,
            warnings,
            anomalies,
            checks,
            admitted,
            excluded: excluded.into_iter().collect(),
            rejection_tally,
        }
    }
}

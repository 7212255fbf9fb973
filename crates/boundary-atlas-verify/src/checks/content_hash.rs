//! Raw payload against the recorded provenance hash.

use boundary_atlas_core::sha256;
use tracing::warn;

use crate::candidate::CandidateDataset;
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode};

/// Every district must record the SHA-256 of the payload it came from.
/// Any mismatch rejects the whole dataset.
pub fn check_content_hash(candidate: &CandidateDataset) -> CheckOutcome {
    let actual = sha256(&candidate.payload);
    let findings: Vec<Finding> = candidate
        .districts
        .iter()
        .filter(|d| d.provenance().content_hash != actual)
        .map(|d| {
            Finding::rejection(
                ReasonCode::ContentHashMismatch,
                format!(
                    "{}: recorded {}, payload hashes to {}",
                    d.id(),
                    d.provenance().content_hash,
                    actual
                ),
            )
        })
        .collect();

    if findings.is_empty() {
        CheckOutcome::passed(CheckKind::ContentHash)
    } else {
        warn!(
            jurisdiction = %candidate.jurisdiction,
            mismatches = findings.len(),
            "content hash mismatch"
        );
        CheckOutcome::new(CheckKind::ContentHash, 0, findings)
    }
}

//! # Boundary Atlas Verify
//!
//! The gatekeeper between acquisition and commitment. A
//! [`CandidateDataset`] passes through independent checks and comes out as
//! an [`AdmissionDecision`]; only admissible datasets are committed.
//!
//! ## Checks
//!
//! - Content hash: the payload must hash to the recorded provenance hash.
//!   A mismatch rejects immediately.
//! - Scope: every district belongs to the candidate's jurisdiction and tier.
//! - Boundary count: discovered against [`ExpectedCountRegistry`], with a
//!   tolerance window.
//! - Topology: coordinate range, self-intersection, overlap within
//!   tessellating tiers, coverage gaps, and misplaced centroids.
//! - Cross-source: agreement with an independent secondary source.
//! - Containment: every district inside its jurisdiction's outline.
//!
//! ## Findings
//!
//! Every [`Finding`] is a rejection, a warning, or an anomaly with a
//! [`ReasonCode`]. Rejections naming a district exclude that district;
//! rejections naming none reject the dataset. Warnings lower confidence.
//! Anomalies are recorded only.
//!
//! ## Proofs
//!
//! [`check_inclusion`] verifies a client-supplied proof against a trusted
//! root without any other state.

pub mod admission;
pub mod candidate;
pub mod checks;
pub mod config;
pub mod outcome;
pub mod proofs;

#[cfg(test)]
mod test_support;

pub use admission::{AdmissionDecision, IntegrityVerifier};
pub use candidate::CandidateDataset;
pub use checks::CountVerdict;
pub use config::{ExpectedCount, ExpectedCountRecord, ExpectedCountRegistry, VerifierConfig};
pub use outcome::{CheckKind, CheckOutcome, Finding, ReasonCode, Severity};
pub use proofs::{check_inclusion, check_inclusion_json, ProofVerdict};

//! Discovered feature count against the registry's expected count.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ExpectedCountRecord, VerifierConfig};
use crate::outcome::{CheckKind, CheckOutcome, Finding, ReasonCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum CountVerdict {
    Exact { count: u32 },
    WithinTolerance { discovered: u32, expected: u32 },
    OutsideTolerance { discovered: u32, expected: u32 },
    Unregistered { discovered: u32 },
}

impl CountVerdict {
    pub fn classify(discovered: u32, expected: Option<&ExpectedCountRecord>, tolerance: u32) -> Self {
        let Some(record) = expected else {
            return CountVerdict::Unregistered { discovered };
        };
        let expected = record.expected.boundaries();
        match discovered.abs_diff(expected) {
            0 => CountVerdict::Exact { count: discovered },
            delta if delta <= tolerance => CountVerdict::WithinTolerance {
                discovered,
                expected,
            },
            _ => CountVerdict::OutsideTolerance {
                discovered,
                expected,
            },
        }
    }
}

pub fn check_boundary_count(
    discovered: u32,
    expected: Option<&ExpectedCountRecord>,
    config: &VerifierConfig,
) -> CheckOutcome {
    let verdict = CountVerdict::classify(discovered, expected, config.count_tolerance);
    debug!(?verdict, "boundary count");

    match verdict {
        CountVerdict::Exact { .. } => CheckOutcome::passed(CheckKind::BoundaryCount),
        CountVerdict::WithinTolerance {
            discovered,
            expected,
        } => {
            let delta = discovered.abs_diff(expected);
            let lost = delta.saturating_mul(u32::from(config.count_penalty_per_unit));
            let confidence = 100u32.saturating_sub(lost) as u8;
            CheckOutcome::new(
                CheckKind::BoundaryCount,
                confidence,
                vec![Finding::warning(
                    ReasonCode::CountDrift,
                    format!("discovered {discovered} boundaries, expected {expected}"),
                )
                .with_magnitude(f64::from(delta))],
            )
        }
        CountVerdict::OutsideTolerance {
            discovered,
            expected,
        } => {
            let delta = discovered.abs_diff(expected);
            warn!(discovered, expected, "boundary count outside tolerance");
            CheckOutcome::new(
                CheckKind::BoundaryCount,
                0,
                vec![Finding::rejection(
                    ReasonCode::CountOutsideTolerance,
                    format!(
                        "discovered {discovered} boundaries, expected {expected} (tolerance {})",
                        config.count_tolerance
                    ),
                )
                .with_magnitude(f64::from(delta))],
            )
        }
        CountVerdict::Unregistered { discovered } => CheckOutcome::new(
            CheckKind::BoundaryCount,
            config.unregistered_count_confidence,
            vec![Finding::warning(
                ReasonCode::CountUnregistered,
                format!("no expected count registered; discovered {discovered}"),
            )],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExpectedCount;
    use crate::outcome::Severity;
    use boundary_atlas_core::BoundaryType;
    use proptest::prelude::*;

    fn expected(count: ExpectedCount) -> ExpectedCountRecord {
        ExpectedCountRecord {
            jurisdiction: "us/wa/seattle".into(),
            district_type: BoundaryType::CouncilDistrict,
            expected: count,
            source: None,
        }
    }

    #[test]
    fn test_exact_count_full_confidence() {
        let out = check_boundary_count(5, Some(&expected(ExpectedCount::Districts(5))), &VerifierConfig::default());
        assert_eq!(out.confidence, 100);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn test_drift_within_tolerance_warns() {
        let out = check_boundary_count(7, Some(&expected(ExpectedCount::Districts(5))), &VerifierConfig::default());
        assert_eq!(out.confidence, 80);
        assert!(!out.is_fatal());
        assert_eq!(out.findings[0].severity, Severity::Warning);
        assert_eq!(out.findings[0].code, ReasonCode::CountDrift);
        assert_eq!(out.findings[0].magnitude, Some(2.0));
    }

    #[test]
    fn test_outside_tolerance_rejects() {
        let out = check_boundary_count(12, Some(&expected(ExpectedCount::Districts(5))), &VerifierConfig::default());
        assert!(out.is_fatal());
        assert_eq!(out.findings[0].code, ReasonCode::CountOutsideTolerance);
        assert_eq!(out.findings[0].magnitude, Some(7.0));
    }

    #[test]
    fn test_at_large_expects_one() {
        let record = expected(ExpectedCount::AtLarge);
        assert_eq!(
            CountVerdict::classify(1, Some(&record), 0),
            CountVerdict::Exact { count: 1 }
        );
        assert_eq!(
            CountVerdict::classify(6, Some(&record), 2),
            CountVerdict::OutsideTolerance {
                discovered: 6,
                expected: 1
            }
        );
    }

    #[test]
    fn test_unregistered_is_warning_not_rejection() {
        let out = check_boundary_count(9, None, &VerifierConfig::default());
        assert!(!out.is_fatal());
        assert_eq!(out.confidence, 75);
        assert_eq!(out.findings[0].code, ReasonCode::CountUnregistered);
    }

    proptest! {
        #[test]
        fn drift_within_tolerance_never_rejects(expected_count in 1u32..60, drift in 0u32..=2, above in any::<bool>()) {
            let config = VerifierConfig::default();
            prop_assume!(drift <= config.count_tolerance);
            let discovered = if above { expected_count + drift } else { expected_count.saturating_sub(drift) };
            let out = check_boundary_count(discovered, Some(&expected(ExpectedCount::Districts(expected_count))), &config);
            prop_assert!(!out.is_fatal());
        }

        #[test]
        fn confidence_falls_as_drift_grows(expected_count in 10u32..60, a in 0u32..8, b in 0u32..8) {
            let config = VerifierConfig::default();
            let record = expected(ExpectedCount::Districts(expected_count));
            let (near, far) = (a.min(b), a.max(b));
            let near_out = check_boundary_count(expected_count + near, Some(&record), &config);
            let far_out = check_boundary_count(expected_count + far, Some(&record), &config);
            prop_assert!(near_out.confidence >= far_out.confidence);
        }
    }
}

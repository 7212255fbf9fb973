//! The independent integrity checks.
//!
//! Each check is a pure function of the candidate and configuration and
//! returns a [`CheckOutcome`](crate::CheckOutcome).

pub mod containment;
pub mod content_hash;
pub mod count;
pub mod cross_source;
pub mod scope;
pub mod topology;

pub use containment::check_containment;
pub use content_hash::check_content_hash;
pub use count::{check_boundary_count, CountVerdict};
pub use cross_source::check_cross_source;
pub use scope::check_scope;
pub use topology::check_topology;

/// Confidence after `warnings` flat penalties.
pub(crate) fn penalized(warnings: usize, penalty: u8) -> u8 {
    let lost = u32::try_from(warnings)
        .unwrap_or(u32::MAX)
        .saturating_mul(u32::from(penalty));
    100u32.saturating_sub(lost) as u8
}

//! Resolver configuration.

use boundary_atlas_core::{AuthorityClass, BoundaryType};
use serde::{Deserialize, Serialize};

/// Confidence (0-100) assigned to a match whose district carries no
/// recorded validation outcome, by publishing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfidence {
    pub federal: u8,
    pub state_gis: u8,
    pub municipal: u8,
    pub community: u8,
}

impl Default for AuthorityConfidence {
    fn default() -> Self {
        Self {
            federal: 95,
            state_gis: 90,
            municipal: 85,
            community: 60,
        }
    }
}

impl AuthorityConfidence {
    pub fn for_authority(&self, authority: AuthorityClass) -> u8 {
        match authority {
            AuthorityClass::Federal => self.federal,
            AuthorityClass::StateGis => self.state_gis,
            AuthorityClass::Municipal => self.municipal,
            AuthorityClass::Community => self.community,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Coarsest tier walked by [`Resolver::resolve`](crate::Resolver::resolve).
    /// County is the universal fallback for in-scope countries.
    pub terminal_tier: BoundaryType,
    pub authority_confidence: AuthorityConfidence,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            terminal_tier: BoundaryType::County,
            authority_confidence: AuthorityConfidence::default(),
        }
    }
}

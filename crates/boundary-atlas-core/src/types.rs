//! Strong type definitions for Boundary Atlas.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Administrative granularity of a boundary.
///
/// Variants are declared finest to coarsest; the derived ordering matches
/// [`BoundaryType::precision_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    CouncilDistrict,
    Ward,
    City,
    Cdp,
    County,
    CongressionalDistrict,
    State,
    Country,
}

impl BoundaryType {
    /// All boundary types in ascending precision rank (finest first).
    pub const ALL: [BoundaryType; 8] = [
        BoundaryType::CouncilDistrict,
        BoundaryType::Ward,
        BoundaryType::City,
        BoundaryType::Cdp,
        BoundaryType::County,
        BoundaryType::CongressionalDistrict,
        BoundaryType::State,
        BoundaryType::Country,
    ];

    /// Precision rank: 0 is the finest granularity.
    pub const fn precision_rank(&self) -> u8 {
        match self {
            BoundaryType::CouncilDistrict => 0,
            BoundaryType::Ward => 1,
            BoundaryType::City => 2,
            BoundaryType::Cdp => 3,
            BoundaryType::County => 4,
            BoundaryType::CongressionalDistrict => 5,
            BoundaryType::State => 6,
            BoundaryType::Country => 7,
        }
    }

    /// Stable string code used in canonical encodings and persistence.
    pub const fn code(&self) -> &'static str {
        match self {
            BoundaryType::CouncilDistrict => "council-district",
            BoundaryType::Ward => "ward",
            BoundaryType::City => "city",
            BoundaryType::Cdp => "cdp",
            BoundaryType::County => "county",
            BoundaryType::CongressionalDistrict => "congressional-district",
            BoundaryType::State => "state",
            BoundaryType::Country => "country",
        }
    }

    /// Parse from a stable string code.
    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| CoreError::UnknownBoundaryType(code.to_string()))
    }

    /// Whether same-tier boundaries of this type are expected to tessellate
    /// their parent jurisdiction.
    pub const fn tessellates(&self) -> bool {
        matches!(self, BoundaryType::CouncilDistrict | BoundaryType::Ward)
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A globally unique district identifier, e.g. `us-wa-seattle-1`.
///
/// Composed from the jurisdiction path and the district identifier. Never
/// derived from arrival order, so re-running an extraction reproduces it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(String);

impl DistrictId {
    /// Compose an id from ordered segments (country, region, locality, district).
    ///
    /// Each segment is slugged: ASCII letters and digits are lowercased and
    /// kept, every other run of characters becomes a single `-`.
    pub fn compose<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            parts.push(slug(segment.as_ref())?);
        }
        if parts.is_empty() {
            return Err(CoreError::InvalidIdentifier(String::new()));
        }
        Ok(Self(parts.join("-")))
    }

    /// Wrap an already-composed id, checking it is in slug form.
    pub fn parse(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--")
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidIdentifier(s.to_string()))
        }
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistrictId({})", self.0)
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DistrictId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the hierarchical jurisdiction path, e.g. `us/wa/seattle`.
pub fn jurisdiction_path(country: &str, region: &str, locality: Option<&str>) -> Result<String> {
    let mut path = format!("{}/{}", slug(country)?, slug(region)?);
    if let Some(locality) = locality {
        path.push('/');
        path.push_str(&slug(locality)?);
    }
    Ok(path)
}

/// Rebuild a caller-supplied path such as `US/WA/Seattle` into the form
/// [`jurisdiction_path`] produces. Two or three `/`-separated segments.
pub fn normalize_jurisdiction(path: &str) -> Result<String> {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        [country, region] => jurisdiction_path(country, region, None),
        [country, region, locality] => jurisdiction_path(country, region, Some(locality)),
        _ => Err(CoreError::InvalidIdentifier(path.to_string())),
    }
}

fn slug(segment: &str) -> Result<String> {
    let mut out = String::with_capacity(segment.len());
    let mut pending_dash = false;
    for c in segment.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        return Err(CoreError::InvalidIdentifier(segment.to_string()));
    }
    Ok(out)
}

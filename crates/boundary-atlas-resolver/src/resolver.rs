//! Hierarchical point-to-boundary resolution.
//!
//! Tiers are walked finest to coarsest. Within a tier, the bbox prefilter
//! is exact (no tolerance) and the point-in-polygon test uses the
//! half-open rule from the geometry kernel, so the same query always gets
//! the same answer. Several matches in one tier are a tessellation
//! anomaly: the lowest id wins and the anomaly is reported with the result.

use boundary_atlas_core::{BoundaryType, Digest, DistrictId, NormalizedDistrict};
use boundary_atlas_merkle::{MerkleProof, SnapshotId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::committed::{CommittedSnapshot, SnapshotHandle};
use crate::config::ResolverConfig;

/// Several same-tier boundaries claim one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TessellationAnomaly {
    pub tier: BoundaryType,
    pub lat: f64,
    pub lng: f64,
    /// Every matching id, ascending. The first one was returned.
    pub candidates: Vec<DistrictId>,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryResolution {
    pub district_id: DistrictId,
    pub name: String,
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    /// Precision rank of the tier that matched.
    pub precision: u8,
    /// 0-100.
    pub confidence: u8,
    pub snapshot_id: SnapshotId,
    pub merkle_root: Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<TessellationAnomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Resolution {
    Found(BoundaryResolution),
    NotFound,
}

impl Resolution {
    pub fn found(&self) -> Option<&BoundaryResolution> {
        match self {
            Resolution::Found(r) => Some(r),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// A resolution together with the inclusion proof of the matched district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenResolution {
    pub resolution: BoundaryResolution,
    pub proof: MerkleProof,
}

/// Query front end over the active snapshot.
///
/// Stateless apart from the shared handle: each call loads the active
/// snapshot once and answers entirely from it.
#[derive(Debug, Clone)]
pub struct Resolver {
    handle: Arc<SnapshotHandle>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(handle: Arc<SnapshotHandle>, config: ResolverConfig) -> Self {
        Self { handle, config }
    }

    pub fn handle(&self) -> &Arc<SnapshotHandle> {
        &self.handle
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a coordinate to the finest committed boundary containing it.
    pub fn resolve(&self, lat: f64, lng: f64, country: Option<&str>) -> Resolution {
        match self.handle.load() {
            Some(committed) => resolve_in(&committed, &self.config, lat, lng, country),
            None => {
                debug!("no active snapshot");
                Resolution::NotFound
            }
        }
    }

    /// Resolve within a single tier only.
    pub fn resolve_tier(
        &self,
        lat: f64,
        lng: f64,
        tier: BoundaryType,
        country: Option<&str>,
    ) -> Resolution {
        let Some(committed) = self.handle.load() else {
            return Resolution::NotFound;
        };
        if !valid_coordinate(lat, lng) {
            return Resolution::NotFound;
        }
        match match_tier(&committed, &self.config, tier, lat, lng, country) {
            Some(found) => Resolution::Found(found),
            None => Resolution::NotFound,
        }
    }

    /// Matches at every tier, finest first, including tiers coarser than
    /// the terminal one.
    pub fn resolve_hierarchy(
        &self,
        lat: f64,
        lng: f64,
        country: Option<&str>,
    ) -> Vec<BoundaryResolution> {
        let Some(committed) = self.handle.load() else {
            return Vec::new();
        };
        if !valid_coordinate(lat, lng) {
            return Vec::new();
        }
        BoundaryType::ALL
            .into_iter()
            .filter_map(|tier| match_tier(&committed, &self.config, tier, lat, lng, country))
            .collect()
    }

    /// Resolve and attach the inclusion proof from the same snapshot.
    pub fn resolve_with_proof(
        &self,
        lat: f64,
        lng: f64,
        country: Option<&str>,
    ) -> Option<ProvenResolution> {
        let committed = self.handle.load()?;
        let resolution = match resolve_in(&committed, &self.config, lat, lng, country) {
            Resolution::Found(r) => r,
            Resolution::NotFound => return None,
        };
        let proof = committed.tree().prove_inclusion(&resolution.district_id)?;
        Some(ProvenResolution { resolution, proof })
    }
}

/// Resolve against one committed snapshot, walking tiers up to the
/// configured terminal tier.
pub fn resolve_in(
    committed: &CommittedSnapshot,
    config: &ResolverConfig,
    lat: f64,
    lng: f64,
    country: Option<&str>,
) -> Resolution {
    if !valid_coordinate(lat, lng) {
        debug!(lat, lng, "coordinate out of range");
        return Resolution::NotFound;
    }

    let terminal = config.terminal_tier.precision_rank();
    for tier in BoundaryType::ALL {
        if tier.precision_rank() > terminal {
            break;
        }
        if let Some(found) = match_tier(committed, config, tier, lat, lng, country) {
            return Resolution::Found(found);
        }
    }
    debug!(lat, lng, "no boundary up to terminal tier");
    Resolution::NotFound
}

fn match_tier(
    committed: &CommittedSnapshot,
    config: &ResolverConfig,
    tier: BoundaryType,
    lat: f64,
    lng: f64,
    country: Option<&str>,
) -> Option<BoundaryResolution> {
    let districts = committed.tree().districts();
    let matches: Vec<&NormalizedDistrict> = committed
        .index()
        .candidates(tier, lng, lat)
        .into_iter()
        .map(|idx| &districts[idx])
        .filter(|d| country.map_or(true, |c| d.country().eq_ignore_ascii_case(c)))
        .filter(|d| d.contains_point(lng, lat))
        .collect();

    // Candidates are ascending by id, so the first match is the tie-break.
    let winner = *matches.first()?;
    let anomaly = (matches.len() > 1).then(|| {
        let anomaly = TessellationAnomaly {
            tier,
            lat,
            lng,
            candidates: matches.iter().map(|d| d.id().clone()).collect(),
        };
        warn!(
            tier = %tier,
            lat,
            lng,
            candidates = ?anomaly.candidates,
            "same-tier boundaries overlap at point"
        );
        anomaly
    });

    let snapshot = committed.snapshot();
    Some(BoundaryResolution {
        district_id: winner.id().clone(),
        name: winner.name().to_string(),
        jurisdiction: winner.jurisdiction().to_string(),
        district_type: tier,
        precision: tier.precision_rank(),
        confidence: confidence_of(winner, config),
        snapshot_id: snapshot.id.clone(),
        merkle_root: snapshot.merkle_root,
        anomaly,
    })
}

fn confidence_of(district: &NormalizedDistrict, config: &ResolverConfig) -> u8 {
    district
        .validation()
        .map(|v| v.confidence.min(100))
        .unwrap_or_else(|| {
            config
                .authority_confidence
                .for_authority(district.provenance().authority)
        })
}

fn valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

//! Per-tier spatial index over a committed district set.
//!
//! One R-tree per [`BoundaryType`], keyed by district bbox. Entries point
//! into the tree's sorted district list, so ascending entry index is
//! ascending district id.

use boundary_atlas_core::{Bounds, BoundaryType, NormalizedDistrict};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone)]
struct IndexedBounds {
    idx: usize,
    bbox: Bounds,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min_lon, self.bbox.min_lat],
            [self.bbox.max_lon, self.bbox.max_lat],
        )
    }
}

#[derive(Clone, Default)]
pub struct TierIndex {
    tiers: BTreeMap<BoundaryType, RTree<IndexedBounds>>,
}

impl fmt::Debug for TierIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.tiers.iter().map(|(tier, rtree)| (tier, rtree.size())))
            .finish()
    }
}

impl TierIndex {
    /// Index districts by tier. `districts` must be the tree's sorted list.
    pub fn build(districts: &[NormalizedDistrict]) -> Self {
        let mut grouped: BTreeMap<BoundaryType, Vec<IndexedBounds>> = BTreeMap::new();
        for (idx, district) in districts.iter().enumerate() {
            grouped
                .entry(district.district_type())
                .or_default()
                .push(IndexedBounds {
                    idx,
                    bbox: *district.bbox(),
                });
        }
        let tiers = grouped
            .into_iter()
            .map(|(tier, entries)| (tier, RTree::bulk_load(entries)))
            .collect();
        Self { tiers }
    }

    /// Indices of districts in `tier` whose closed bbox contains the point,
    /// ascending. No tolerance is applied.
    pub fn candidates(&self, tier: BoundaryType, lon: f64, lat: f64) -> Vec<usize> {
        let Some(rtree) = self.tiers.get(&tier) else {
            return Vec::new();
        };
        let mut out: Vec<usize> = rtree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter(|entry| entry.bbox.contains_point(lon, lat))
            .map(|entry| entry.idx)
            .collect();
        out.sort_unstable();
        out
    }
}

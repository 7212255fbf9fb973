//! Canonicalizer: raw validated boundaries to [`NormalizedDistrict`]s.
//!
//! Canonicalization is a pure function of its input. Coordinates are snapped
//! to the leaf grid before any topology test, so what is checked is exactly
//! what gets committed.

use geo::algorithm::orient::{Direction, Orient};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::canonical::{snap, unsnap};
use crate::district::{BoundaryGeometry, NormalizedDistrict};
use crate::geometry::{area_m2, coordinates_in_range, self_intersection_count};
use crate::provenance::ProvenanceMetadata;
use crate::types::{jurisdiction_path, BoundaryType, DistrictId};

/// Why a raw boundary was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    Topology,
    Projection,
    Completeness,
    Duplication,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectionReason::Topology => "topology",
            RejectionReason::Projection => "projection",
            RejectionReason::Completeness => "completeness",
            RejectionReason::Duplication => "duplication",
        })
    }
}

/// A raw boundary refused by the canonicalizer.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{reason} rejection for {label}: {detail}")]
pub struct Rejection {
    /// The composed id when it could be built, else the raw identifier.
    pub label: String,
    pub reason: RejectionReason,
    pub detail: String,
}

/// A raw boundary with its geometry already reprojected to WGS84.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBoundary {
    pub country: String,
    pub region: String,
    /// City or county segment; `None` for region-wide boundaries.
    pub locality: Option<String>,
    /// District identifier within the jurisdiction, e.g. `"1"` or `"Ward 3"`.
    pub district: String,
    pub name: String,
    pub district_type: BoundaryType,
    pub geometry: BoundaryGeometry,
    pub provenance: ProvenanceMetadata,
}

impl RawBoundary {
    /// Id segments in composition order.
    fn id_segments(&self) -> Vec<&str> {
        let mut segments = vec![self.country.as_str(), self.region.as_str()];
        if let Some(locality) = &self.locality {
            segments.push(locality);
        }
        segments.push(&self.district);
        segments
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalizerConfig {
    /// Refuse sources whose declared coordinate system is not WGS84.
    pub require_wgs84: bool,
    /// Minimum positions per closed ring.
    pub min_ring_positions: usize,
    /// Polygons at or below this geodesic area are treated as empty.
    pub min_polygon_area_m2: f64,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        Self {
            require_wgs84: true,
            min_ring_positions: 4,
            min_polygon_area_m2: 0.0,
        }
    }
}

/// Result of canonicalizing a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<NormalizedDistrict>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    config: CanonicalizerConfig,
}

impl Canonicalizer {
    pub fn new(config: CanonicalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CanonicalizerConfig {
        &self.config
    }

    /// Canonicalize one raw boundary.
    pub fn canonicalize(&self, raw: &RawBoundary) -> Result<NormalizedDistrict, Rejection> {
        let label = raw.id_segments().join("-");
        let reject = |reason, detail: String| Rejection {
            label: label.clone(),
            reason,
            detail,
        };

        // 1. Coordinate system and ranges
        if self.config.require_wgs84 && !raw.provenance.is_wgs84() {
            return Err(reject(
                RejectionReason::Projection,
                format!("coordinate system {} is not WGS84", raw.provenance.coordinate_system),
            ));
        }
        if raw.geometry.is_empty() {
            return Err(reject(RejectionReason::Completeness, "empty geometry".into()));
        }
        if !coordinates_in_range(raw.geometry.polygons()) {
            return Err(reject(
                RejectionReason::Projection,
                "coordinate outside lon/lat range or non-finite".into(),
            ));
        }

        // 2. Identity
        if raw.name.trim().is_empty() {
            return Err(reject(RejectionReason::Completeness, "empty name".into()));
        }
        let id = DistrictId::compose(&raw.id_segments())
            .map_err(|e| reject(RejectionReason::Completeness, e.to_string()))?;
        let jurisdiction =
            jurisdiction_path(&raw.country, &raw.region, raw.locality.as_deref())
                .map_err(|e| reject(RejectionReason::Completeness, e.to_string()))?;
        let label = id.to_string();
        let reject = |reason, detail: String| Rejection {
            label: label.clone(),
            reason,
            detail,
        };

        // 3. Snap, close, orient
        let mut polygons = Vec::with_capacity(raw.geometry.polygons().len());
        for (idx, polygon) in raw.geometry.polygons().iter().enumerate() {
            let polygon = snap_polygon(polygon)
                .map_err(|detail| reject(RejectionReason::Projection, detail))?;

            let short_ring = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .any(|ring| ring.0.len() < self.config.min_ring_positions);
            if short_ring {
                return Err(reject(
                    RejectionReason::Completeness,
                    format!(
                        "polygon {idx} has a ring with fewer than {} positions",
                        self.config.min_ring_positions
                    ),
                ));
            }

            let crossings = self_intersection_count(&polygon);
            if crossings > 0 {
                return Err(reject(
                    RejectionReason::Topology,
                    format!("polygon {idx} has {crossings} self-intersections"),
                ));
            }

            let area = area_m2(&MultiPolygon::new(vec![polygon.clone()]));
            if area <= self.config.min_polygon_area_m2 {
                return Err(reject(
                    RejectionReason::Completeness,
                    format!("polygon {idx} has zero area"),
                ));
            }

            polygons.push(polygon.orient(Direction::Default));
        }

        let geometry = match raw.geometry {
            BoundaryGeometry::Polygon(_) if polygons.len() == 1 => {
                BoundaryGeometry::Polygon(polygons.remove(0))
            }
            _ => BoundaryGeometry::MultiPolygon(MultiPolygon::new(polygons)),
        };

        // 4. Assemble with derived bbox
        NormalizedDistrict::with_derived_bbox(
            id,
            raw.name.trim().to_string(),
            jurisdiction,
            raw.district_type,
            geometry,
            raw.provenance.clone(),
        )
        .map_err(|e| reject(RejectionReason::Completeness, e.to_string()))
    }

    /// Canonicalize a batch. The second and later records sharing an id are
    /// rejected as duplicates, in input order.
    pub fn canonicalize_batch(&self, raws: &[RawBoundary]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut seen = HashSet::new();
        for raw in raws {
            match self.canonicalize(raw) {
                Ok(district) => {
                    if seen.insert(district.id().clone()) {
                        outcome.accepted.push(district);
                    } else {
                        outcome.rejected.push(Rejection {
                            label: district.id().to_string(),
                            reason: RejectionReason::Duplication,
                            detail: "id already present in batch".into(),
                        });
                    }
                }
                Err(rejection) => outcome.rejected.push(rejection),
            }
        }
        outcome
    }
}

fn snap_polygon(polygon: &Polygon<f64>) -> Result<Polygon<f64>, String> {
    let exterior = snap_ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(snap_ring)
        .collect::<Result<Vec<_>, _>>()?;
    // Polygon::new closes every ring.
    Ok(Polygon::new(exterior, interiors))
}

fn snap_ring(ring: &LineString<f64>) -> Result<LineString<f64>, String> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in &ring.0 {
        let snapped = Coord {
            x: unsnap(snap(c.x).map_err(|e| e.to_string())?),
            y: unsnap(snap(c.y).map_err(|e| e.to_string())?),
        };
        if coords.last() != Some(&snapped) {
            coords.push(snapped);
        }
    }
    Ok(LineString::new(coords))
}

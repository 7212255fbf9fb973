//! Geometry kernel: bounding boxes, exact point-in-polygon, and the
//! topology measurements used by the integrity verifier.
//!
//! Point-in-polygon uses the crossing-number test with half-open edges: an
//! edge owns its lower endpoint and excludes its upper one, and a crossing
//! is counted only when the edge lies strictly east of the query point.
//! Consequently a point on an edge shared by two adjacent polygons belongs
//! to exactly one of them: the polygon to its east for a vertical edge, the
//! polygon to its north for a horizontal edge. The rule is a pure function
//! of the coordinates, so every run gives the same answer.
//!
//! Areas are geodesic (square metres on the WGS84 ellipsoid) so that
//! thresholds are absolute, not percentages.

use geo::{BooleanOps, Centroid, Coord, CoordsIter, GeodesicArea, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Axis-aligned bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Closed containment: points on the box edge are inside.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Grow the box by `tolerance` degrees on every side.
    ///
    /// Only for admission heuristics. The resolve path never expands boxes.
    pub fn expanded(&self, tolerance: f64) -> Self {
        Self {
            min_lon: self.min_lon - tolerance,
            min_lat: self.min_lat - tolerance,
            max_lon: self.max_lon + tolerance,
            max_lat: self.max_lat + tolerance,
        }
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Center as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Tight bound over every coordinate of the polygons, or `None` if empty.
pub fn bounds_of(polygons: &[Polygon<f64>]) -> Option<Bounds> {
    let mut coords = polygons.iter().flat_map(|p| p.coords_iter());
    let first = coords.next()?;
    let init = Bounds::new(first.x, first.y, first.x, first.y);
    Some(coords.fold(init, |b, c| Bounds {
        min_lon: b.min_lon.min(c.x),
        min_lat: b.min_lat.min(c.y),
        max_lon: b.max_lon.max(c.x),
        max_lat: b.max_lat.max(c.y),
    }))
}

/// Crossing-number test against one ring, with half-open edges.
pub fn point_in_ring(ring: &LineString<f64>, lon: f64, lat: f64) -> bool {
    let pts = &ring.0;
    let n = pts.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (pts[i].x, pts[i].y);
        let (xj, yj) = (pts[j].x, pts[j].y);
        if (yi > lat) != (yj > lat) {
            let x_cross = (xj - xi) * (lat - yi) / (yj - yi) + xi;
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Inside the exterior ring and outside every hole.
pub fn polygon_contains_point(polygon: &Polygon<f64>, lon: f64, lat: f64) -> bool {
    point_in_ring(polygon.exterior(), lon, lat)
        && !polygon
            .interiors()
            .iter()
            .any(|hole| point_in_ring(hole, lon, lat))
}

/// A match on any constituent polygon counts.
pub fn geometry_contains_point(polygons: &[Polygon<f64>], lon: f64, lat: f64) -> bool {
    polygons
        .iter()
        .any(|p| polygon_contains_point(p, lon, lat))
}

/// Every coordinate finite and within lon [-180, 180] / lat [-90, 90].
pub fn coordinates_in_range(polygons: &[Polygon<f64>]) -> bool {
    polygons.iter().flat_map(|p| p.coords_iter()).all(|c| {
        c.x.is_finite()
            && c.y.is_finite()
            && (-180.0..=180.0).contains(&c.x)
            && (-90.0..=90.0).contains(&c.y)
    })
}

struct Segment {
    ring: usize,
    index: usize,
    a: Coord<f64>,
    b: Coord<f64>,
}

/// Number of intersecting pairs of non-adjacent segments across all rings
/// of a polygon. A valid polygon has zero.
pub fn self_intersection_count(polygon: &Polygon<f64>) -> usize {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .collect();

    let mut segments = Vec::new();
    let mut ring_sizes = Vec::with_capacity(rings.len());
    for (ring_idx, ring) in rings.iter().enumerate() {
        let mut count = 0;
        for (index, line) in ring.lines().enumerate() {
            if line.start == line.end {
                continue;
            }
            segments.push(Segment {
                ring: ring_idx,
                index,
                a: line.start,
                b: line.end,
            });
            count = index + 1;
        }
        ring_sizes.push(count);
    }

    let mut crossings = 0;
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (s, t) = (&segments[i], &segments[j]);
            if s.ring == t.ring {
                let last = ring_sizes[s.ring].saturating_sub(1);
                let adjacent = t.index == s.index + 1 || (s.index == 0 && t.index == last);
                if adjacent {
                    continue;
                }
            }
            if segments_intersect(s.a, s.b, t.a, t.b) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Coord<f64>, p2: Coord<f64>, q1: Coord<f64>, q2: Coord<f64>) -> bool {
    if p1.x.max(p2.x) < q1.x.min(q2.x)
        || q1.x.max(q2.x) < p1.x.min(p2.x)
        || p1.y.max(p2.y) < q1.y.min(q2.y)
        || q1.y.max(q2.y) < p1.y.min(p2.y)
    {
        return false;
    }

    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Geodesic area in square metres.
pub fn area_m2(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.geodesic_area_unsigned()
}

/// Geodesic area of the intersection of two geometries, in square metres.
pub fn intersection_area_m2(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    a.intersection(b).geodesic_area_unsigned()
}

/// Union of all geometries.
pub fn union_all(geometries: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
    geometries
        .iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, g| acc.union(g))
}

/// Intersection over union of two geometries. Two empty geometries are
/// considered identical.
pub fn iou(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    let inter = intersection_area_m2(a, b);
    let union = area_m2(a) + area_m2(b) - inter;
    if union <= 0.0 {
        1.0
    } else {
        (inter / union).clamp(0.0, 1.0)
    }
}

pub fn centroid(geometry: &MultiPolygon<f64>) -> Option<Point<f64>> {
    geometry.centroid()
}

/// Great-circle distance between two `(lon, lat)` points.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lon1, lat1) = (a.0.to_radians(), a.1.to_radians());
    let (lon2, lat2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]
    }

    #[test]
    fn test_bounds_of_square() {
        let b = bounds_of(&[square(1.0, 2.0, 3.0, 4.0)]).unwrap();
        assert_eq!(b, Bounds::new(1.0, 2.0, 3.0, 4.0));
        assert!(bounds_of(&[]).is_none());
    }

    #[test]
    fn test_bounds_closed_containment() {
        let b = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(b.contains_point(1.0, 1.0));
        assert!(b.contains_point(0.5, 0.0));
        assert!(!b.contains_point(1.0000001, 0.5));
        assert!(b.expanded(0.01).contains_point(1.005, 0.5));
    }

    #[test]
    fn test_point_in_polygon_with_hole() {
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let hole = square(4.0, 4.0, 6.0, 6.0);
        let p = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);

        assert!(polygon_contains_point(&p, 1.0, 1.0));
        assert!(!polygon_contains_point(&p, 5.0, 5.0));
        assert!(!polygon_contains_point(&p, 11.0, 5.0));
    }

    #[test]
    fn test_shared_vertical_edge_belongs_to_east_polygon() {
        let west = square(0.0, 0.0, 1.0, 1.0);
        let east = square(1.0, 0.0, 2.0, 1.0);
        assert!(!polygon_contains_point(&west, 1.0, 0.5));
        assert!(polygon_contains_point(&east, 1.0, 0.5));
    }

    #[test]
    fn test_shared_horizontal_edge_belongs_to_north_polygon() {
        let south = square(0.0, 0.0, 1.0, 1.0);
        let north = square(0.0, 1.0, 1.0, 2.0);
        assert!(!polygon_contains_point(&south, 0.5, 1.0));
        assert!(polygon_contains_point(&north, 0.5, 1.0));
    }

    #[test]
    fn test_multipolygon_any_member() {
        let parts = vec![square(0.0, 0.0, 1.0, 1.0), square(5.0, 5.0, 6.0, 6.0)];
        assert!(geometry_contains_point(&parts, 5.5, 5.5));
        assert!(!geometry_contains_point(&parts, 3.0, 3.0));
    }

    #[test]
    fn test_self_intersection_count() {
        assert_eq!(self_intersection_count(&square(0.0, 0.0, 1.0, 1.0)), 0);

        let bowtie: Polygon<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
        assert_eq!(self_intersection_count(&bowtie), 1);
    }

    #[test]
    fn test_hole_touching_exterior_is_counted() {
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let hole = square(0.0, 4.0, 2.0, 6.0);
        let p = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);
        assert!(self_intersection_count(&p) > 0);
    }

    #[test]
    fn test_coordinates_in_range() {
        assert!(coordinates_in_range(&[square(-122.4, 47.5, -122.3, 47.7)]));
        assert!(!coordinates_in_range(&[square(-190.0, 0.0, -170.0, 1.0)]));
        assert!(!coordinates_in_range(&[square(0.0, 89.0, 1.0, 91.0)]));
    }

    #[test]
    fn test_geodesic_area_one_degree_at_equator() {
        let area = area_m2(&MultiPolygon::new(vec![square(0.0, 0.0, 1.0, 1.0)]));
        assert!(area > 1.2e10 && area < 1.25e10, "area = {area}");
    }

    #[test]
    fn test_intersection_and_iou() {
        let a = MultiPolygon::new(vec![square(0.0, 0.0, 0.02, 0.02)]);
        let b = MultiPolygon::new(vec![square(0.01, 0.0, 0.03, 0.02)]);
        let inter = intersection_area_m2(&a, &b);
        let half = area_m2(&a) / 2.0;
        assert!((inter - half).abs() / half < 1e-3);

        let v = iou(&a, &b);
        assert!((v - 1.0 / 3.0).abs() < 1e-3, "iou = {v}");
        assert!((iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_all_disjoint() {
        let parts = vec![
            MultiPolygon::new(vec![square(0.0, 0.0, 0.01, 0.01)]),
            MultiPolygon::new(vec![square(0.02, 0.0, 0.03, 0.01)]),
        ];
        let union = union_all(&parts);
        let expected = area_m2(&parts[0]) + area_m2(&parts[1]);
        assert!((area_m2(&union) - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn test_haversine_seattle_portland() {
        let d = haversine_km((-122.3321, 47.6062), (-122.6765, 45.5231));
        assert!(d > 225.0 && d < 240.0, "d = {d}");
    }
}

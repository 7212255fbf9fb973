//! Proptest generators for property-based testing.

use proptest::prelude::*;

use boundary_atlas_core::{BoundaryType, Canonicalizer, HashFunction, NormalizedDistrict};

use crate::fixtures::{provenance, raw, square, PAYLOAD};

/// Grid cell size in degrees.
pub const CELL_DEG: f64 = 0.01;

const GRID_WEST: f64 = -122.44;
const GRID_SOUTH: f64 = 47.49;

/// Generate a hash function.
pub fn hash_function() -> impl Strategy<Value = HashFunction> {
    prop_oneof![Just(HashFunction::Sha256), Just(HashFunction::Poseidon)]
}

/// Generate a WGS84 coordinate as `(lat, lng)`.
pub fn coordinate() -> impl Strategy<Value = (f64, f64)> {
    (-90.0f64..=90.0, -180.0f64..=180.0)
}

/// Generate a tessellating tier.
pub fn tessellating_tier() -> impl Strategy<Value = BoundaryType> {
    prop_oneof![Just(BoundaryType::CouncilDistrict), Just(BoundaryType::Ward)]
}

/// The council district occupying grid cell `(col, row)`.
pub fn grid_cell(col: u32, row: u32) -> NormalizedDistrict {
    let x0 = GRID_WEST + CELL_DEG * f64::from(col);
    let y0 = GRID_SOUTH + CELL_DEG * f64::from(row);
    let raw = raw(
        "us/wa/seattle",
        &format!("c{col}r{row}"),
        &format!("Cell {col}/{row}"),
        BoundaryType::CouncilDistrict,
        square(x0, y0, x0 + CELL_DEG, y0 + CELL_DEG),
        provenance(PAYLOAD, 1),
    );
    Canonicalizer::default()
        .canonicalize(&raw)
        .expect("grid cells canonicalize")
}

/// Generate between 1 and `max` districts on distinct grid cells.
///
/// Cells never overlap, so any subset is a valid tier.
pub fn grid_districts(max: usize) -> impl Strategy<Value = Vec<NormalizedDistrict>> {
    prop::collection::btree_set((0u32..16, 0u32..16), 1..=max.max(1))
        .prop_map(|cells| cells.into_iter().map(|(c, r)| grid_cell(c, r)).collect())
}

/// Generate a point strictly inside grid cell `(col, row)`, as `(lat, lng)`.
pub fn point_in_cell(col: u32, row: u32) -> impl Strategy<Value = (f64, f64)> {
    let x0 = GRID_WEST + CELL_DEG * f64::from(col);
    let y0 = GRID_SOUTH + CELL_DEG * f64::from(row);
    (0.05f64..0.95, 0.05f64..0.95)
        .prop_map(move |(fx, fy)| (y0 + fy * CELL_DEG, x0 + fx * CELL_DEG))
}

//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Every raw boundary carries
//! provenance whose content hash matches its dataset's payload, so fixtures
//! pass the content-hash check unless a test tampers with them.

use boundary_atlas_core::{
    AcquisitionMethod, AuthorityClass, BoundaryGeometry, BoundaryType, Canonicalizer,
    NormalizedDistrict, ProvenanceMetadata, RawBoundary,
};
use boundary_atlas_verify::{
    CandidateDataset, ExpectedCount, ExpectedCountRecord, ExpectedCountRegistry,
};
use geo::polygon;

/// Payload shared by single-district fixtures.
pub const PAYLOAD: &[u8] = br#"{"type":"FeatureCollection","features":[]}"#;

/// 2025-01-14T16:00:00Z
pub const ACQUIRED_AT: i64 = 1_736_870_400_000;

/// Seattle's extent as `(west, south, east, north)`.
pub const SEATTLE_EXTENT: (f64, f64, f64, f64) = (-122.44, 47.49, -122.23, 47.74);

/// King County's extent, a strict superset of [`SEATTLE_EXTENT`].
pub const KING_COUNTY_EXTENT: (f64, f64, f64, f64) = (-122.55, 47.08, -121.06, 47.78);

/// An axis-aligned, counter-clockwise square.
pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryGeometry {
    BoundaryGeometry::Polygon(
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)],
    )
}

/// A square with a small square tab of side `tab` protruding east from
/// its east edge, starting at latitude `tab_south`.
pub fn square_with_tab(x0: f64, y0: f64, x1: f64, y1: f64, tab_south: f64, tab: f64) -> BoundaryGeometry {
    let (ty0, ty1, tx) = (tab_south, tab_south + tab, x1 + tab);
    BoundaryGeometry::Polygon(polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: ty0),
        (x: tx, y: ty0),
        (x: tx, y: ty1),
        (x: x1, y: ty1),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ])
}

/// A self-intersecting figure eight over the given square.
pub fn bowtie(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryGeometry {
    BoundaryGeometry::Polygon(
        polygon![(x: x0, y: y0), (x: x1, y: y1), (x: x1, y: y0), (x: x0, y: y1), (x: x0, y: y0)],
    )
}

fn extent(e: (f64, f64, f64, f64)) -> BoundaryGeometry {
    square(e.0, e.1, e.2, e.3)
}

/// Provenance for an ArcGIS REST response from a municipal server.
pub fn provenance(payload: &[u8], feature_count: u32) -> ProvenanceMetadata {
    ProvenanceMetadata::for_payload(
        "https://gis.seattle.gov/arcgis/rest/services/council/FeatureServer/0",
        AuthorityClass::Municipal,
        ACQUIRED_AT,
        AcquisitionMethod::ArcgisRest,
        payload,
        200,
        feature_count,
        "esriGeometryPolygon",
    )
}

/// A raw boundary under `jurisdiction` (a path such as `us/wa/seattle`).
///
/// # Panics
/// If `jurisdiction` has fewer than two segments.
pub fn raw(
    jurisdiction: &str,
    district: &str,
    name: &str,
    district_type: BoundaryType,
    geometry: BoundaryGeometry,
    provenance: ProvenanceMetadata,
) -> RawBoundary {
    let mut segments = jurisdiction.split('/');
    let country = segments.next().unwrap_or_default();
    let region = segments.next().expect("jurisdiction needs country and region");
    RawBoundary {
        country: country.into(),
        region: region.into(),
        locality: segments.next().map(Into::into),
        district: district.into(),
        name: name.into(),
        district_type,
        geometry,
        provenance,
    }
}

/// A canonicalized council district from its full id, e.g. `us-wa-seattle-1`.
///
/// The last id segment is the district; the rest is the jurisdiction path.
/// The name is `District <n>`, matching [`seattle_council`].
///
/// # Panics
/// If the geometry does not canonicalize.
pub fn district(id: &str, geometry: BoundaryGeometry) -> NormalizedDistrict {
    let (path, number) = id.rsplit_once('-').expect("id needs a district segment");
    let jurisdiction = path.replace('-', "/");
    let raw = raw(
        &jurisdiction,
        number,
        &format!("District {number}"),
        BoundaryType::CouncilDistrict,
        geometry,
        provenance(PAYLOAD, 1),
    );
    Canonicalizer::default()
        .canonicalize(&raw)
        .expect("fixture geometry canonicalizes")
}

/// One source's worth of raw boundaries, ready for admission.
#[derive(Debug, Clone)]
pub struct DatasetFixture {
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    pub boundaries: Vec<RawBoundary>,
    pub payload: Vec<u8>,
    pub outline: Option<BoundaryGeometry>,
}

impl DatasetFixture {
    /// Canonicalize every boundary into a verifier candidate.
    pub fn candidate(&self) -> CandidateDataset {
        let batch = Canonicalizer::default().canonicalize_batch(&self.boundaries);
        let candidate = CandidateDataset::new(
            self.jurisdiction.clone(),
            self.district_type,
            batch.accepted,
            self.payload.clone(),
        );
        match &self.outline {
            Some(outline) => candidate.with_jurisdiction_boundary(outline.clone()),
            None => candidate,
        }
    }

    /// Replace the geometry of the boundary whose district segment is
    /// `district`. Provenance is untouched.
    pub fn with_geometry(mut self, district: &str, geometry: BoundaryGeometry) -> Self {
        for boundary in &mut self.boundaries {
            if boundary.district == district {
                boundary.geometry = geometry.clone();
            }
        }
        self
    }

    /// Rename the boundary whose district segment is `district`.
    pub fn with_name(mut self, district: &str, name: &str) -> Self {
        for boundary in &mut self.boundaries {
            if boundary.district == district {
                boundary.name = name.to_string();
            }
        }
        self
    }

    /// Same boundaries, attributed to a different payload. The content hash
    /// check fails for every boundary.
    pub fn with_foreign_payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }
}

/// Seattle council districts as `count` north-south strips tiling
/// [`SEATTLE_EXTENT`], numbered from the west starting at 1.
pub fn seattle_council(count: u32) -> DatasetFixture {
    let (_, south, _, north) = SEATTLE_EXTENT;

    let features: Vec<String> = (1..=count)
        .map(|n| format!(r#"{{"type":"Feature","properties":{{"DISTRICT":{n}}}}}"#))
        .collect();
    let payload = format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
    .into_bytes();
    let source = provenance(&payload, count);

    let boundaries = (1..=count)
        .map(|n| {
            let (w, e) = seattle_strip_edges(n, count);
            raw(
                "us/wa/seattle",
                &n.to_string(),
                &format!("District {n}"),
                BoundaryType::CouncilDistrict,
                square(w, south, e, north),
                source.clone(),
            )
        })
        .collect();

    DatasetFixture {
        jurisdiction: "us/wa/seattle".into(),
        district_type: BoundaryType::CouncilDistrict,
        boundaries,
        payload,
        outline: Some(extent(SEATTLE_EXTENT)),
    }
}

/// West and east edges of Seattle council strip `n` of `count`.
pub fn seattle_strip_edges(n: u32, count: u32) -> (f64, f64) {
    let (west, _, east, _) = SEATTLE_EXTENT;
    let step = (east - west) / f64::from(count);
    let edge = |i: u32| if i == count { east } else { west + step * f64::from(i) };
    (edge(n - 1), edge(n))
}

/// A point inside Seattle council strip `n` of `count`, as `(lat, lng)`.
pub fn seattle_point(n: u32, count: u32) -> (f64, f64) {
    let (west, south, east, north) = SEATTLE_EXTENT;
    let step = (east - west) / f64::from(count);
    let lng = west + step * (f64::from(n) - 0.5);
    ((south + north) / 2.0, lng)
}

/// Registry expecting `count` Seattle council districts.
pub fn seattle_registry(count: u32) -> ExpectedCountRegistry {
    ExpectedCountRegistry::new().with(ExpectedCountRecord {
        jurisdiction: "us/wa/seattle".into(),
        district_type: BoundaryType::CouncilDistrict,
        expected: ExpectedCount::Districts(count),
        source: Some("Seattle City Charter, Art. IV".into()),
    })
}

/// Council districts inside a city inside a county.
#[derive(Debug, Clone)]
pub struct NestedFixture {
    pub council: DatasetFixture,
    pub city: DatasetFixture,
    pub county: DatasetFixture,
}

impl NestedFixture {
    pub fn all(&self) -> Vec<DatasetFixture> {
        vec![self.council.clone(), self.city.clone(), self.county.clone()]
    }
}

/// Seattle's council strips, the city of Seattle, and King County.
pub fn nested_fixture(council_count: u32) -> NestedFixture {
    NestedFixture {
        council: seattle_council(council_count),
        city: single(
            "seattle",
            "Seattle",
            BoundaryType::City,
            extent(SEATTLE_EXTENT),
            br#"{"type":"FeatureCollection","features":[{"NAME":"Seattle"}]}"#,
        ),
        county: single(
            "king",
            "King County",
            BoundaryType::County,
            extent(KING_COUNTY_EXTENT),
            br#"{"type":"FeatureCollection","features":[{"NAME":"King"}]}"#,
        ),
    }
}

fn single(
    district: &str,
    name: &str,
    district_type: BoundaryType,
    geometry: BoundaryGeometry,
    payload: &[u8],
) -> DatasetFixture {
    DatasetFixture {
        jurisdiction: "us/wa".into(),
        district_type,
        boundaries: vec![raw(
            "us/wa",
            district,
            name,
            district_type,
            geometry,
            provenance(payload, 1),
        )],
        payload: payload.to_vec(),
        outline: None,
    }
}

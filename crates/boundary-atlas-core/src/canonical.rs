//! Canonical CBOR encoding of Merkle leaves.
//!
//! RFC 8949 Core Deterministic Encoding:
//! - Map keys are text, sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats: coordinates are snapped to a 1e-7 degree grid and encoded as
//!   signed integers
//!
//! The leaf covers `{v, id, name, jurisdiction, type, bbox, geometry}`.
//! Provenance is deliberately absent so that independent extraction runs of
//! the same boundaries produce the same root.

use ciborium::value::{Integer, Value};
use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::district::{BoundaryGeometry, NormalizedDistrict};
use crate::error::{CoreError, Result};
use crate::types::{BoundaryType, DistrictId};

/// Leaf encoding version.
pub const LEAF_VERSION: u64 = 1;

/// Grid units per degree.
pub const COORD_SCALE: i64 = 10_000_000;

mod keys {
    pub const VERSION: &str = "v";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const JURISDICTION: &str = "jurisdiction";
    pub const TYPE: &str = "type";
    pub const BBOX: &str = "bbox";
    pub const GEOMETRY: &str = "geometry";
    pub const KIND: &str = "kind";
    pub const POLYGONS: &str = "polygons";
}

/// The committed fields of a leaf, with coordinates in grid units.
///
/// `polygons[p][r]` is ring `r` of polygon `p` as a flat
/// `[lon0, lat0, lon1, lat1, ...]` array; ring 0 is the exterior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRecord {
    pub version: u64,
    pub id: DistrictId,
    pub name: String,
    pub jurisdiction: String,
    pub district_type: BoundaryType,
    /// `[min_lon, min_lat, max_lon, max_lat]` in grid units.
    pub bbox: [i64; 4],
    pub geometry_kind: String,
    pub polygons: Vec<Vec<Vec<i64>>>,
}

/// Snap a degree value to the grid. Rounds half away from zero.
pub fn snap(degrees: f64) -> Result<i64> {
    if !degrees.is_finite() {
        return Err(CoreError::EncodingError(format!(
            "non-finite coordinate: {degrees}"
        )));
    }
    let scaled = (degrees * COORD_SCALE as f64).round();
    if scaled.abs() > (200 * COORD_SCALE) as f64 {
        return Err(CoreError::EncodingError(format!(
            "coordinate out of range: {degrees}"
        )));
    }
    Ok(scaled as i64)
}

/// Degree value of a grid coordinate.
pub fn unsnap(units: i64) -> f64 {
    units as f64 / COORD_SCALE as f64
}

impl LeafRecord {
    pub fn from_district(district: &NormalizedDistrict) -> Result<Self> {
        let b = district.bbox();
        let bbox = [
            snap(b.min_lon)?,
            snap(b.min_lat)?,
            snap(b.max_lon)?,
            snap(b.max_lat)?,
        ];

        let mut polygons = Vec::with_capacity(district.polygons().len());
        for polygon in district.polygons() {
            let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
            rings.push(ring_units(polygon.exterior())?);
            for hole in polygon.interiors() {
                rings.push(ring_units(hole)?);
            }
            polygons.push(rings);
        }

        Ok(Self {
            version: LEAF_VERSION,
            id: district.id().clone(),
            name: district.name().to_string(),
            jurisdiction: district.jurisdiction().to_string(),
            district_type: district.district_type(),
            bbox,
            geometry_kind: district.geometry().kind().to_string(),
            polygons,
        })
    }

    /// Canonical CBOR bytes of this record.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode_value_to(&mut buf, &self.to_cbor_value())?;
        Ok(buf)
    }

    /// Rebuild the committed geometry in degrees.
    pub fn geometry(&self) -> BoundaryGeometry {
        let polygons: Vec<Polygon<f64>> = self
            .polygons
            .iter()
            .map(|rings| {
                let mut rings = rings.iter().map(|r| ring_from_units(r));
                let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
                Polygon::new(exterior, rings.collect())
            })
            .collect();
        match (self.geometry_kind.as_str(), polygons.len()) {
            ("polygon", 1) => {
                BoundaryGeometry::Polygon(polygons.into_iter().next().unwrap_or_else(empty_polygon))
            }
            _ => BoundaryGeometry::MultiPolygon(MultiPolygon::new(polygons)),
        }
    }

    fn to_cbor_value(&self) -> Value {
        let text = |s: &str| Value::Text(s.to_string());
        let int = |n: i64| Value::Integer(n.into());

        let polygons = self
            .polygons
            .iter()
            .map(|rings| {
                Value::Array(
                    rings
                        .iter()
                        .map(|ring| Value::Array(ring.iter().map(|&n| int(n)).collect()))
                        .collect(),
                )
            })
            .collect();

        let geometry = Value::Map(vec![
            (text(keys::KIND), text(&self.geometry_kind)),
            (text(keys::POLYGONS), Value::Array(polygons)),
        ]);

        Value::Map(vec![
            (text(keys::VERSION), Value::Integer(self.version.into())),
            (text(keys::ID), text(self.id.as_str())),
            (text(keys::NAME), text(&self.name)),
            (text(keys::JURISDICTION), text(&self.jurisdiction)),
            (text(keys::TYPE), text(self.district_type.code())),
            (
                text(keys::BBOX),
                Value::Array(self.bbox.iter().map(|&n| int(n)).collect()),
            ),
            (text(keys::GEOMETRY), geometry),
        ])
    }
}

fn empty_polygon() -> Polygon<f64> {
    Polygon::new(LineString::new(Vec::new()), Vec::new())
}

fn ring_units(ring: &LineString<f64>) -> Result<Vec<i64>> {
    let mut out = Vec::with_capacity(ring.0.len() * 2);
    for c in &ring.0 {
        out.push(snap(c.x)?);
        out.push(snap(c.y)?);
    }
    Ok(out)
}

fn ring_from_units(units: &[i64]) -> LineString<f64> {
    LineString::new(
        units
            .chunks_exact(2)
            .map(|p| Coord {
                x: unsnap(p[0]),
                y: unsnap(p[1]),
            })
            .collect(),
    )
}

/// Encode a district's leaf to canonical CBOR bytes.
pub fn canonical_leaf_bytes(district: &NormalizedDistrict) -> Result<Vec<u8>> {
    LeafRecord::from_district(district)?.encode()
}

/// Decode canonical leaf bytes.
///
/// Input that is valid CBOR but not in canonical form (re-encoding differs,
/// or trailing bytes follow the value) is rejected.
pub fn decode_leaf(bytes: &[u8]) -> Result<LeafRecord> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let record = cbor_value_to_leaf(&value)?;
    if record.encode()? != bytes {
        return Err(CoreError::MalformedLeaf("non-canonical encoding".into()));
    }
    Ok(record)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not allowed in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

fn cbor_value_to_leaf(value: &Value) -> Result<LeafRecord> {
    let map = as_map(value, "leaf")?;

    let version = as_int(field(map, keys::VERSION)?, keys::VERSION)?;
    if version != LEAF_VERSION as i64 {
        return Err(CoreError::MalformedLeaf(format!(
            "unsupported leaf version {version}"
        )));
    }

    let id = DistrictId::parse(as_text(field(map, keys::ID)?, keys::ID)?)?;
    let name = as_text(field(map, keys::NAME)?, keys::NAME)?.to_string();
    let jurisdiction = as_text(field(map, keys::JURISDICTION)?, keys::JURISDICTION)?.to_string();
    let district_type = BoundaryType::from_code(as_text(field(map, keys::TYPE)?, keys::TYPE)?)?;

    let bbox_values = as_array(field(map, keys::BBOX)?, keys::BBOX)?;
    if bbox_values.len() != 4 {
        return Err(CoreError::MalformedLeaf("bbox must have 4 entries".into()));
    }
    let mut bbox = [0i64; 4];
    for (slot, v) in bbox.iter_mut().zip(bbox_values) {
        *slot = as_int(v, keys::BBOX)?;
    }

    let geometry = as_map(field(map, keys::GEOMETRY)?, keys::GEOMETRY)?;
    let geometry_kind = as_text(field(geometry, keys::KIND)?, keys::KIND)?.to_string();
    if geometry_kind != "polygon" && geometry_kind != "multipolygon" {
        return Err(CoreError::MalformedLeaf(format!(
            "unknown geometry kind {geometry_kind}"
        )));
    }

    let mut polygons = Vec::new();
    for polygon in as_array(field(geometry, keys::POLYGONS)?, keys::POLYGONS)? {
        let mut rings = Vec::new();
        for ring in as_array(polygon, "polygon")? {
            let coords = as_array(ring, "ring")?;
            if coords.len() % 2 != 0 {
                return Err(CoreError::MalformedLeaf("odd coordinate count".into()));
            }
            let mut units = Vec::with_capacity(coords.len());
            for c in coords {
                units.push(as_int(c, "ring")?);
            }
            rings.push(units);
        }
        polygons.push(rings);
    }

    Ok(LeafRecord {
        version: LEAF_VERSION,
        id,
        name,
        jurisdiction,
        district_type,
        bbox,
        geometry_kind,
        polygons,
    })
}

fn field<'a>(map: &'a [(Value, Value)], key: &str) -> Result<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
        .map(|(_, v)| v)
        .ok_or_else(|| CoreError::MalformedLeaf(format!("missing {key}")))
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)]> {
    match value {
        Value::Map(m) => Ok(m),
        _ => Err(CoreError::MalformedLeaf(format!("{what}: expected map"))),
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(a) => Ok(a),
        _ => Err(CoreError::MalformedLeaf(format!("{what}: expected array"))),
    }
}

fn as_text<'a>(value: &'a Value, what: &str) -> Result<&'a str> {
    match value {
        Value::Text(t) => Ok(t),
        _ => Err(CoreError::MalformedLeaf(format!("{what}: expected text"))),
    }
}

fn as_int(value: &Value, what: &str) -> Result<i64> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedLeaf(format!("{what}: integer out of range"))),
        _ => Err(CoreError::MalformedLeaf(format!("{what}: expected integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::provenance::{AcquisitionMethod, AuthorityClass, ProvenanceMetadata};
    use geo::polygon;

    fn district(payload: &[u8]) -> NormalizedDistrict {
        let geometry = BoundaryGeometry::Polygon(polygon![
            (x: -122.4, y: 47.6),
            (x: -122.3, y: 47.6),
            (x: -122.3, y: 47.7),
            (x: -122.4, y: 47.7),
            (x: -122.4, y: 47.6),
        ]);
        NormalizedDistrict::from_parts(
            DistrictId::parse("us-wa-seattle-1").unwrap(),
            "District 1".into(),
            "us/wa/seattle".into(),
            BoundaryType::CouncilDistrict,
            geometry,
            Bounds::new(-122.4, 47.6, -122.3, 47.7),
            ProvenanceMetadata::for_payload(
                "test://seattle",
                AuthorityClass::Municipal,
                1_736_870_400_000,
                AcquisitionMethod::Manual,
                payload,
                200,
                1,
                "Polygon",
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let d = district(b"a");
        assert_eq!(canonical_leaf_bytes(&d).unwrap(), canonical_leaf_bytes(&d).unwrap());
    }

    #[test]
    fn test_provenance_not_in_leaf() {
        assert_eq!(
            canonical_leaf_bytes(&district(b"run one")).unwrap(),
            canonical_leaf_bytes(&district(b"run two")).unwrap()
        );
    }

    #[test]
    fn test_snap_rounding() {
        assert_eq!(snap(0.00000017).unwrap(), 2);
        assert_eq!(snap(-0.00000017).unwrap(), -2);
        assert_eq!(snap(-0.0).unwrap(), 0);
        assert_eq!(snap(-122.3321).unwrap(), -1_223_321_000);
        assert!(snap(f64::NAN).is_err());
        assert!(snap(f64::INFINITY).is_err());
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 65535);
        assert_eq!(buf, vec![0x19, 0xff, 0xff]);

        buf.clear();
        encode_integer(&mut buf, Integer::from(-1i64));
        assert_eq!(buf, vec![0x20]);

        buf.clear();
        encode_integer(&mut buf, Integer::from(-1_223_321_000i64));
        assert_eq!(buf[0], 0x3a);
    }

    #[test]
    fn test_map_keys_sorted_by_encoded_bytes() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Text("name".into()), Value::Integer(1.into())),
            (Value::Text("v".into()), Value::Integer(2.into())),
            (Value::Text("id".into()), Value::Integer(3.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();
        // Shorter keys first: "v" (0x61), "id" (0x62), "name" (0x64).
        assert_eq!(buf[0], 0xa3);
        assert_eq!(&buf[1..3], &[0x61, b'v']);
        assert_eq!(buf[3], 0x02);
        assert_eq!(&buf[4..7], &[0x62, b'i', b'd']);
    }

    #[test]
    fn test_float_rejected() {
        let mut buf = Vec::new();
        assert!(encode_value_to(&mut buf, &Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_leaf_roundtrip() {
        let d = district(b"a");
        let bytes = canonical_leaf_bytes(&d).unwrap();
        let leaf = decode_leaf(&bytes).unwrap();
        assert_eq!(leaf.id, *d.id());
        assert_eq!(leaf.district_type, BoundaryType::CouncilDistrict);
        assert_eq!(leaf.bbox, [-1_224_000_000, 476_000_000, -1_223_000_000, 477_000_000]);
        assert_eq!(leaf.geometry(), *d.geometry());
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        let d = district(b"a");
        let leaf = LeafRecord::from_district(&d).unwrap();
        let mut non_canonical = Vec::new();
        ciborium::into_writer(&leaf.to_cbor_value(), &mut non_canonical).unwrap();
        // ciborium keeps insertion order; the canonical form sorts keys.
        assert_ne!(non_canonical, leaf.encode().unwrap());
        assert!(decode_leaf(&non_canonical).is_err());

        let mut trailing = leaf.encode().unwrap();
        trailing.push(0x00);
        assert!(decode_leaf(&trailing).is_err());
    }
}

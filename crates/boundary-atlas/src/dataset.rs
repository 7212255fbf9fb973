//! The committed dataset as stored in the content store.
//!
//! One district record per line (JSON lines), in tree order. The snapshot's
//! `dataset_pointer` is the SHA-256 of exactly these bytes.

use boundary_atlas_core::{sha256, Digest, NormalizedDistrict};
use bytes::Bytes;

use crate::error::{AtlasError, Result};

pub const DATASET_MEDIA_TYPE: &str = "application/x-ndjson";

/// Serialize districts and return the bytes with their content hash.
pub fn encode_dataset(districts: &[NormalizedDistrict]) -> Result<(Digest, Bytes)> {
    let mut buf = Vec::new();
    for district in districts {
        serde_json::to_writer(&mut buf, district)
            .map_err(|e| AtlasError::Dataset(format!("{}: {e}", district.id())))?;
        buf.push(b'\n');
    }
    Ok((sha256(&buf), Bytes::from(buf)))
}

/// Parse a stored dataset. Every record re-checks its bbox invariant.
pub fn decode_dataset(bytes: &[u8]) -> Result<Vec<NormalizedDistrict>> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(n, line)| {
            serde_json::from_slice(line)
                .map_err(|e| AtlasError::Dataset(format!("line {}: {e}", n + 1)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_testkit::fixtures::{district, square};

    #[test]
    fn test_dataset_roundtrip_preserves_leaves() {
        let districts = vec![
            district("us-wa-seattle-1", square(-122.40, 47.60, -122.35, 47.65)),
            district("us-wa-seattle-2", square(-122.35, 47.60, -122.30, 47.65)),
        ];
        let (hash, bytes) = encode_dataset(&districts).unwrap();
        assert_eq!(hash, sha256(&bytes));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 2);

        let back = decode_dataset(&bytes).unwrap();
        assert_eq!(back, districts);
        for (a, b) in back.iter().zip(&districts) {
            assert_eq!(
                a.canonical_bytes().unwrap(),
                b.canonical_bytes().unwrap()
            );
        }
    }

    #[test]
    fn test_decode_reports_bad_line() {
        let (_, bytes) = encode_dataset(&[district(
            "us-wa-seattle-1",
            square(-122.40, 47.60, -122.35, 47.65),
        )])
        .unwrap();
        let mut corrupted = bytes.to_vec();
        corrupted.extend_from_slice(b"{not json}\n");

        let err = decode_dataset(&corrupted).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

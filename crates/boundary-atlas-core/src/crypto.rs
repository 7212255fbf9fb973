//! Hash functions for Merkle leaves and interior nodes.
//!
//! Two functions are supported, chosen per tree:
//! - **SHA-256** for general tamper detection. Leaf = `SHA-256(0x00 || bytes)`,
//!   node = `SHA-256(0x01 || lo || hi)`.
//! - **Poseidon** over BN254 (circom parameters) for leaves consumed by a
//!   zero-knowledge membership circuit. The canonical bytes are split into
//!   31-byte field elements; the state starts at `Fr(len)` and absorbs each
//!   chunk with the width-3 permutation `state = P(LEAF_TAG, state, chunk)`.
//!   Nodes use the width-2 permutation `P(lo, hi)`.
//!
//! In both cases the two children of a node are ordered by byte-wise
//! comparison before hashing (`lo <= hi`). Proofs therefore need no direction
//! bits. This convention is part of the public proof format.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// Length of every digest, for both hash functions.
pub const DIGEST_LEN: usize = 32;

/// Bytes per field element chunk. 31 bytes always fit below the BN254 modulus.
pub const FIELD_CHUNK_LEN: usize = 31;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;
const POSEIDON_LEAF_TAG: u64 = 1;

/// A 32-byte digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string. A leading `0x` is accepted.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(CoreError::InvalidDigest(format!(
                "expected {} bytes, got {}",
                DIGEST_LEN,
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Flip a single bit. Used to build tamper fixtures.
    pub fn with_bit_flipped(&self, bit: usize) -> Self {
        let mut out = self.0;
        out[(bit / 8) % DIGEST_LEN] ^= 1 << (bit % 8);
        Self(out)
    }

    /// Zero digest (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Plain SHA-256 of data (content hashes, dataset pointers).
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

/// The hash function a Merkle tree is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashFunction {
    Sha256,
    Poseidon,
}

impl Default for HashFunction {
    fn default() -> Self {
        HashFunction::Sha256
    }
}

impl HashFunction {
    /// Stable string code.
    pub const fn code(&self) -> &'static str {
        match self {
            HashFunction::Sha256 => "sha256",
            HashFunction::Poseidon => "poseidon",
        }
    }

    /// Parse from a stable string code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "sha256" => Some(HashFunction::Sha256),
            "poseidon" => Some(HashFunction::Poseidon),
            _ => None,
        }
    }

    /// Root of a tree with no leaves.
    pub fn empty_root(&self) -> Digest {
        match self {
            HashFunction::Sha256 => sha256(b""),
            HashFunction::Poseidon => Digest::ZERO,
        }
    }

    /// Hash a canonical leaf encoding.
    pub fn hash_leaf(&self, bytes: &[u8]) -> Result<Digest> {
        match self {
            HashFunction::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update([LEAF_PREFIX]);
                hasher.update(bytes);
                Ok(Digest(hasher.finalize().into()))
            }
            HashFunction::Poseidon => poseidon_leaf(bytes),
        }
    }

    /// Hash two child digests into their parent, in sorted-pair order.
    pub fn hash_pair(&self, a: &Digest, b: &Digest) -> Result<Digest> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        match self {
            HashFunction::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update([NODE_PREFIX]);
                hasher.update(lo.0);
                hasher.update(hi.0);
                Ok(Digest(hasher.finalize().into()))
            }
            HashFunction::Poseidon => {
                let mut poseidon = Poseidon::<Fr>::new_circom(2)
                    .map_err(|e| CoreError::Hash(e.to_string()))?;
                let out = poseidon
                    .hash(&[digest_to_field(lo), digest_to_field(hi)])
                    .map_err(|e| CoreError::Hash(e.to_string()))?;
                Ok(field_to_digest(&out))
            }
        }
    }

    /// Whether `digest` is a value this hash function can produce.
    ///
    /// For Poseidon, the digest must be the canonical encoding of a field
    /// element (below the modulus).
    pub fn is_canonical_digest(&self, digest: &Digest) -> bool {
        match self {
            HashFunction::Sha256 => true,
            HashFunction::Poseidon => field_to_digest(&digest_to_field(digest)) == *digest,
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Split bytes into big-endian field element encodings of 31-byte chunks.
///
/// This is the witness layout a membership circuit absorbs when
/// recomputing a Poseidon leaf.
pub fn field_chunks(bytes: &[u8]) -> Vec<[u8; 32]> {
    bytes
        .chunks(FIELD_CHUNK_LEN)
        .map(|chunk| {
            let mut out = [0u8; 32];
            out[32 - chunk.len()..].copy_from_slice(chunk);
            out
        })
        .collect()
}

fn poseidon_leaf(bytes: &[u8]) -> Result<Digest> {
    let mut poseidon =
        Poseidon::<Fr>::new_circom(3).map_err(|e| CoreError::Hash(e.to_string()))?;
    let tag = Fr::from(POSEIDON_LEAF_TAG);
    let mut state = Fr::from(bytes.len() as u64);
    for chunk in field_chunks(bytes) {
        let element = Fr::from_be_bytes_mod_order(&chunk);
        state = poseidon
            .hash(&[tag, state, element])
            .map_err(|e| CoreError::Hash(e.to_string()))?;
    }
    Ok(field_to_digest(&state))
}

fn digest_to_field(digest: &Digest) -> Fr {
    Fr::from_be_bytes_mod_order(&digest.0)
}

fn field_to_digest(element: &Fr) -> Digest {
    let bytes = element.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    let start = DIGEST_LEN.saturating_sub(bytes.len());
    out[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(DIGEST_LEN)..]);
    Digest(out)
}

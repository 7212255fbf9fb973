//! Tamper-evident audit log.
//!
//! Every event is folded into a running BLAKE3 head:
//!
//! ```text
//! head_0 = [0; 32]
//! head_n = BLAKE3("boundary-atlas-audit-v1:" || head_{n-1} || cbor(event_n))
//! ```
//!
//! Rewriting or dropping any past event changes every later head.

use boundary_atlas_core::{BoundaryType, Digest, DistrictId};
use boundary_atlas_merkle::SnapshotId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;
use crate::error::Result;

const AUDIT_DOMAIN: &[u8] = b"boundary-atlas-audit-v1:";

/// Something that happened to the registry's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unix ms.
    pub at: i64,
    pub kind: AuditEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AuditEventKind {
    SnapshotCommitted {
        snapshot_id: SnapshotId,
        merkle_root: Digest,
        district_count: usize,
        supersedes: Option<SnapshotId>,
    },
    SnapshotActivated {
        snapshot_id: SnapshotId,
        previous: Option<SnapshotId>,
    },
    DatasetRejected {
        jurisdiction: String,
        district_type: BoundaryType,
        confidence: u8,
        reasons: Vec<String>,
    },
    DistrictExcluded {
        district_id: DistrictId,
        reasons: Vec<String>,
    },
    BoundaryRejected {
        label: String,
        reason: String,
    },
    TessellationAnomaly {
        snapshot_id: SnapshotId,
        district_type: BoundaryType,
        lat: f64,
        lng: f64,
        candidates: Vec<DistrictId>,
    },
}

impl AuditEvent {
    pub fn new(at: i64, kind: AuditEventKind) -> Self {
        Self { at, kind }
    }

    /// Bytes folded into the chain.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }
}

/// An event as persisted, with its position and the chain head after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// 1-based.
    pub seq: u64,
    pub event: AuditEvent,
    pub head: Digest,
}

/// Owns the running head of the audit chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditChain {
    head: Digest,
    len: u64,
}

impl Default for AuditChain {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditChain {
    pub const GENESIS: Digest = Digest::ZERO;

    pub fn new() -> Self {
        Self {
            head: Self::GENESIS,
            len: 0,
        }
    }

    /// Continue a chain whose last stored event is `len` with `head`.
    pub fn resume(head: Digest, len: u64) -> Self {
        Self { head, len }
    }

    /// Continue after `last`, or start fresh.
    pub fn after(last: Option<&StoredEvent>) -> Self {
        last.map_or_else(Self::new, |e| Self::resume(e.head, e.seq))
    }

    pub fn head(&self) -> Digest {
        self.head
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One fold step.
    pub fn link(head: &Digest, canonical: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(AUDIT_DOMAIN);
        hasher.update(&head.0);
        hasher.update(canonical);
        Digest(*hasher.finalize().as_bytes())
    }

    pub fn append(&mut self, event: AuditEvent) -> Result<StoredEvent> {
        let head = Self::link(&self.head, &event.canonical_bytes()?);
        self.head = head;
        self.len += 1;
        Ok(StoredEvent {
            seq: self.len,
            event,
            head,
        })
    }
}

/// Where and why a stored chain fails to recompute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit chain broken at seq {seq}: {reason}")]
pub struct ChainBreak {
    pub seq: u64,
    pub reason: String,
}

/// Recompute the chain from genesis and return its head.
pub fn verify_chain(events: &[StoredEvent]) -> std::result::Result<Digest, ChainBreak> {
    let mut chain = AuditChain::new();
    for stored in events {
        if stored.seq != chain.len() + 1 {
            return Err(ChainBreak {
                seq: stored.seq,
                reason: format!("expected seq {}", chain.len() + 1),
            });
        }
        let recomputed = chain.append(stored.event.clone()).map_err(|e| ChainBreak {
            seq: stored.seq,
            reason: e.to_string(),
        })?;
        if recomputed.head != stored.head {
            return Err(ChainBreak {
                seq: stored.seq,
                reason: format!("head {} does not recompute ({})", stored.head, recomputed.head),
            });
        }
    }
    Ok(chain.head())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rejected(at: i64, confidence: u8) -> AuditEvent {
        AuditEvent::new(
            at,
            AuditEventKind::DatasetRejected {
                jurisdiction: "us/wa/seattle".into(),
                district_type: BoundaryType::CouncilDistrict,
                confidence,
                reasons: vec!["[count-outside-tolerance] 12 districts, expected 7".into()],
            },
        )
    }

    fn chain_of(n: i64) -> Vec<StoredEvent> {
        let mut chain = AuditChain::new();
        (0..n)
            .map(|i| chain.append(rejected(1_000 + i, 40)).unwrap())
            .collect()
    }

    #[test]
    fn test_chain_verifies() {
        let events = chain_of(4);
        assert_eq!(events[3].seq, 4);
        assert_eq!(verify_chain(&events).unwrap(), events[3].head);
        assert_eq!(verify_chain(&[]).unwrap(), AuditChain::GENESIS);
    }

    #[test]
    fn test_chain_is_deterministic() {
        assert_eq!(chain_of(3), chain_of(3));
    }

    #[test]
    fn test_tampered_event_breaks_chain() {
        let mut events = chain_of(4);
        events[1].event = rejected(1_001, 99);
        let err = verify_chain(&events).unwrap_err();
        assert_eq!(err.seq, 2);
    }

    #[test]
    fn test_dropped_event_breaks_chain() {
        let mut events = chain_of(4);
        events.remove(2);
        let err = verify_chain(&events).unwrap_err();
        assert_eq!(err.seq, 4);
    }

    #[test]
    fn test_resume_continues_head() {
        let events = chain_of(2);
        let mut resumed = AuditChain::after(events.last());
        let third = resumed.append(rejected(5_000, 10)).unwrap();
        assert_eq!(third.seq, 3);

        let mut all = events;
        all.push(third);
        assert!(verify_chain(&all).is_ok());
    }

    #[test]
    fn test_event_roundtrips_cbor() {
        let event = AuditEvent::new(
            7,
            AuditEventKind::TessellationAnomaly {
                snapshot_id: SnapshotId::new("snap-7-00"),
                district_type: BoundaryType::CouncilDistrict,
                lat: 47.6062,
                lng: -122.3321,
                candidates: vec![DistrictId::parse("us-wa-seattle-1").unwrap()],
            },
        );
        let bytes = event.canonical_bytes().unwrap();
        let back: AuditEvent = codec::decode(&bytes).unwrap();
        assert_eq!(back, event);
    }

    proptest! {
        #[test]
        fn any_tampered_confidence_breaks_chain(len in 1i64..8, at in 0usize..8, confidence in 0u8..=100) {
            let mut events = chain_of(len);
            let at = at % events.len();
            prop_assume!(confidence != 40);
            events[at].event = rejected(1_000 + at as i64, confidence);
            let err = verify_chain(&events).unwrap_err();
            prop_assert_eq!(err.seq, at as u64 + 1);
        }
    }
}

//! Sealed ledger blocks and their canonical hash preimage.
//!
//! A block's `hash` is a SHA-256 digest over an explicitly constructed
//! canonical serialization of (index, sealed_at, records,
//! previous_hash) — the `hash` field itself is never part of its own
//! preimage. The digest is computed exactly once, at seal time;
//! verification recomputes it from the stored fields.

use serde::{Deserialize, Serialize};

use vigil_core::types::Timestamp;

use crate::hashing::sha256_hex;
use crate::record::LedgerRecord;

/// Previous-hash sentinel for the first block in a chain.
pub const GENESIS_HASH: &str = "0";

// ---------------------------------------------------------------------------
// LedgerBlock
// ---------------------------------------------------------------------------

/// A sealed, immutable batch of ledger records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerBlock {
    /// Position in the chain, starting at 0.
    pub index: u64,
    /// When the block was sealed (UTC).
    pub sealed_at: Timestamp,
    pub records: Vec<LedgerRecord>,
    /// Hash of the predecessor, or [`GENESIS_HASH`] for block 0.
    pub previous_hash: String,
    /// SHA-256 hex digest over the canonical preimage.
    pub hash: String,
}

/// Canonical hash preimage: every stored field except `hash`, in a
/// fixed declaration order.
#[derive(Serialize)]
struct BlockPreimage<'a> {
    index: u64,
    sealed_at: &'a Timestamp,
    records: &'a [LedgerRecord],
    previous_hash: &'a str,
}

impl LedgerBlock {
    /// Seal a new block over a batch of records.
    ///
    /// Only [`crate::chain::Ledger`] calls this, under its seal lock.
    pub(crate) fn seal(index: u64, records: Vec<LedgerRecord>, previous_hash: String) -> Self {
        let sealed_at = chrono::Utc::now();
        let hash = hash_preimage(index, &sealed_at, &records, &previous_hash);
        Self {
            index,
            sealed_at,
            records,
            previous_hash,
            hash,
        }
    }

    /// Recompute the digest from the stored fields.
    ///
    /// Equal to `self.hash` exactly when the block is untampered.
    pub fn compute_hash(&self) -> String {
        hash_preimage(self.index, &self.sealed_at, &self.records, &self.previous_hash)
    }
}

fn hash_preimage(
    index: u64,
    sealed_at: &Timestamp,
    records: &[LedgerRecord],
    previous_hash: &str,
) -> String {
    let preimage = BlockPreimage {
        index,
        sealed_at,
        records,
        previous_hash,
    };
    // Record payloads use struct fields and BTreeMaps throughout, so
    // this serialization is deterministic.
    let bytes =
        serde_json::to_vec(&preimage).expect("ledger records are always serialisable");
    sha256_hex(&bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The append-only chain and its pending record buffer.
//!
//! Many monitoring tasks call [`Ledger::add_record`] concurrently;
//! sealing drains the buffer and appends the new block as a single
//! atomic unit under one lock, so no record is ever lost or split
//! across two blocks. No caller holds the lock across an await point.

use std::sync::Mutex;

use crate::block::{LedgerBlock, GENESIS_HASH};
use crate::record::LedgerRecord;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Verification found a block whose digest or linkage is wrong.
    /// Unrecoverable: trust in the chain is void from `index` onward.
    #[error("chain integrity violated at block {index}: {reason}")]
    ChainIntegrity { index: u64, reason: String },

    /// A previous verification failed; the ledger refuses further
    /// writes and trust-dependent reads until the chain is replaced.
    #[error("ledger halted after an integrity failure")]
    Halted,
}

/// Result of a seal request.
#[derive(Debug)]
pub enum SealOutcome {
    /// A new block was appended.
    Sealed(LedgerBlock),
    /// The pending buffer was empty; the chain is unchanged.
    NothingToSeal,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

struct ChainState {
    chain: Vec<LedgerBlock>,
    pending: Vec<LedgerRecord>,
    halted: bool,
}

/// Append-only, hash-chained ledger with an in-memory pending buffer.
#[derive(Default)]
pub struct Ledger {
    inner: Mutex<ChainState>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            chain: Vec::new(),
            pending: Vec::new(),
            halted: false,
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the pending buffer.
    ///
    /// Never blocks beyond the short buffer lock. Fails only when the
    /// ledger is halted after an integrity failure.
    pub fn add_record(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        if state.halted {
            return Err(LedgerError::Halted);
        }
        state.pending.push(record);
        Ok(())
    }

    /// Atomically drain the pending buffer into a new sealed block.
    ///
    /// With an empty buffer this is a no-op — no empty blocks are ever
    /// produced. The drain, linkage, digest, and append happen under a
    /// single lock so a concurrent `add_record` lands either wholly in
    /// this block or wholly in the next.
    pub fn seal_block(&self) -> Result<SealOutcome, LedgerError> {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        if state.halted {
            return Err(LedgerError::Halted);
        }
        if state.pending.is_empty() {
            return Ok(SealOutcome::NothingToSeal);
        }

        let records = std::mem::take(&mut state.pending);
        let index = state.chain.len() as u64;
        let previous_hash = state
            .chain
            .last()
            .map(|block| block.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let block = LedgerBlock::seal(index, records, previous_hash);
        tracing::debug!(
            index,
            record_count = block.records.len(),
            "Sealed ledger block"
        );
        state.chain.push(block.clone());
        Ok(SealOutcome::Sealed(block))
    }

    /// Recompute every block's digest and check linkage.
    ///
    /// On the first inconsistency the ledger latches into the halted
    /// state and the error names the offending block index — chain
    /// corruption is never absorbed silently.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        match verify_blocks(&state.chain) {
            Ok(()) => Ok(()),
            Err(err) => {
                state.halted = true;
                tracing::error!(error = %err, "Ledger chain failed verification; halting");
                Err(err)
            }
        }
    }

    /// Snapshot of the sealed chain.
    ///
    /// Refused while halted — a corrupt chain must not be read as if
    /// it were trustworthy.
    pub fn blocks(&self) -> Result<Vec<LedgerBlock>, LedgerError> {
        let state = self.inner.lock().expect("ledger lock poisoned");
        if state.halted {
            return Err(LedgerError::Halted);
        }
        Ok(state.chain.clone())
    }

    /// Number of sealed blocks.
    pub fn chain_len(&self) -> usize {
        self.inner.lock().expect("ledger lock poisoned").chain.len()
    }

    /// Number of records awaiting the next seal.
    pub fn pending_len(&self) -> usize {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .pending
            .len()
    }

    /// Whether an integrity failure has latched the ledger shut.
    pub fn is_halted(&self) -> bool {
        self.inner.lock().expect("ledger lock poisoned").halted
    }
}

/// Verify an arbitrary block sequence: per-block digest, positional
/// index, and previous-hash linkage back to the genesis sentinel.
///
/// Returns the index of the first inconsistent block.
pub fn verify_blocks(blocks: &[LedgerBlock]) -> Result<(), LedgerError> {
    for (position, block) in blocks.iter().enumerate() {
        let index = position as u64;

        if block.index != index {
            return Err(LedgerError::ChainIntegrity {
                index,
                reason: format!("stored index {} does not match position", block.index),
            });
        }

        if block.compute_hash() != block.hash {
            return Err(LedgerError::ChainIntegrity {
                index,
                reason: "stored hash does not match recomputed digest".to_string(),
            });
        }

        let expected_previous = if position == 0 {
            GENESIS_HASH
        } else {
            blocks[position - 1].hash.as_str()
        };
        if block.previous_hash != expected_previous {
            return Err(LedgerError::ChainIntegrity {
                index,
                reason: "previous-hash link is broken".to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

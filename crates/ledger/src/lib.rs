//! Tamper-evident, append-only medical ledger.
//!
//! Every observation and decision the monitoring pipeline makes is
//! recorded as a [`LedgerRecord`], batched into hash-chained
//! [`LedgerBlock`]s by [`Ledger::seal_block`], and verifiable after
//! the fact with [`Ledger::verify_chain`].
//!
//! - [`record`] — the closed sum type of record kinds.
//! - [`block`] — sealed blocks and their canonical hash preimage.
//! - [`chain`] — the concurrent pending-buffer + chain container.

pub mod block;
pub mod chain;
pub mod hashing;
pub mod record;

pub use block::{LedgerBlock, GENESIS_HASH};
pub use chain::{Ledger, LedgerError, SealOutcome};
pub use record::{LedgerRecord, RegisteredProfile};

//! Monitoring supervisor, alert routing, and ledger sealing.
//!
//! This crate runs the continuous side of the pipeline:
//!
//! - [`supervisor`] — one cooperative task per actively-monitored
//!   patient, bounded by a shared worker pool.
//! - [`cycle`] — the poll → evaluate → alert → record cycle body.
//! - [`router`] — per-patient alert fan-out through a
//!   [`NotificationTransport`].
//! - [`delivery`] — concrete transports (webhook, log).
//! - [`sealer`] — the periodic time-triggered ledger seal loop.

pub mod cycle;
pub mod delivery;
pub mod router;
pub mod sealer;
pub mod supervisor;

pub use cycle::{CycleError, CycleOutcome};
pub use router::{AlertRouter, DeliveryError, DispatchReport, NotificationTransport};
pub use supervisor::{MonitoringSupervisor, StartOutcome, TaskState};

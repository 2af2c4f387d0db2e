//! The care-agent facade over the monitoring pipeline.
//!
//! [`facade::CareAgent`] is the single entry point callers use:
//! registration, biometrics capture, alert subscriptions, monitoring
//! lifecycle, synchronous risk queries, appointment scheduling, and
//! ledger access all go through it. [`sim`] provides the simulated
//! devices and baseline evaluator used by the demo binary and tests.

pub mod facade;
pub mod scheduling;
pub mod sim;

pub use facade::{AgentError, CareAgent, RegistrationOutcome};
pub use scheduling::{
    AppointmentCriteria, AppointmentOptimizer, AppointmentProposal, Priority, SchedulingError,
};

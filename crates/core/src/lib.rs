//! Vigil domain types and capability interfaces.
//!
//! This crate has zero internal dependencies so it can be used by the
//! ledger, the monitoring supervisor, and any future CLI tooling:
//!
//! - [`patient`] — patient profiles, biometric snapshots, registration
//!   input validation.
//! - [`registry`] — synchronized in-memory patient/provider registries.
//! - [`telemetry`] — readings and the [`TelemetrySource`] capability.
//! - [`risk`] — risk assessments and the [`RiskEvaluator`] boundary.
//! - [`alert`] — alert payloads and the vitals threshold policy.
//! - [`config`] — monitoring configuration loaded from the environment.

pub mod alert;
pub mod config;
pub mod error;
pub mod patient;
pub mod registry;
pub mod risk;
pub mod telemetry;
pub mod types;

pub use alert::{AlertLevel, AlertPayload, VitalThresholds};
pub use config::MonitorConfig;
pub use error::CoreError;
pub use patient::{Biometrics, HealthcareProvider, Patient, RegisterPatientRequest};
pub use registry::{PatientRegistry, ProviderRegistry};
pub use risk::{EvaluatorError, RiskAssessment, RiskEvaluator, RiskLevel};
pub use telemetry::{Observation, SourceError, TelemetryReading, TelemetrySource};

//! Telemetry readings and the device-source capability interface.
//!
//! Any device type that can produce a timestamped reading and vouch
//! for its own output is usable as a [`TelemetrySource`] — wearables,
//! bedside monitors, and the simulated sources used in tests all
//! implement the same two operations.

use serde::{Deserialize, Serialize};

use crate::types::{PatientId, Timestamp};

// ---------------------------------------------------------------------------
// TelemetryReading
// ---------------------------------------------------------------------------

/// A single timestamped reading from one device.
///
/// Every vital field is optional because devices differ in what they
/// measure; a pulse oximeter reports SpO2 and heart rate, a smart cuff
/// reports blood pressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Stable identifier of the reporting device.
    pub device_id: String,
    /// When the device captured the reading (UTC).
    pub recorded_at: Timestamp,
    pub heart_rate_bpm: Option<u32>,
    pub systolic_mmhg: Option<u32>,
    pub diastolic_mmhg: Option<u32>,
    pub temperature_celsius: Option<f64>,
    pub oxygen_saturation_pct: Option<u8>,
    pub respiratory_rate: Option<u32>,
}

impl TelemetryReading {
    /// An empty reading for the given device, stamped now.
    pub fn empty(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            recorded_at: chrono::Utc::now(),
            heart_rate_bpm: None,
            systolic_mmhg: None,
            diastolic_mmhg: None,
            temperature_celsius: None,
            oxygen_saturation_pct: None,
            respiratory_rate: None,
        }
    }

    /// Whether the reading carries at least one measured vital.
    pub fn has_measurements(&self) -> bool {
        self.heart_rate_bpm.is_some()
            || self.systolic_mmhg.is_some()
            || self.diastolic_mmhg.is_some()
            || self.temperature_celsius.is_some()
            || self.oxygen_saturation_pct.is_some()
            || self.respiratory_rate.is_some()
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// The combined output of one monitoring cycle: every validated
/// reading collected across the patient's devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub patient_id: PatientId,
    /// When the cycle assembled the observation (UTC).
    pub collected_at: Timestamp,
    pub readings: Vec<TelemetryReading>,
}

impl Observation {
    pub fn new(patient_id: PatientId, readings: Vec<TelemetryReading>) -> Self {
        Self {
            patient_id,
            collected_at: chrono::Utc::now(),
            readings,
        }
    }
}

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Failure polling a telemetry source. Always recoverable from the
/// monitoring task's perspective — the next cycle polls again.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device read failed: {0}")]
    Read(String),
}

// ---------------------------------------------------------------------------
// TelemetrySource
// ---------------------------------------------------------------------------

/// Capability interface for anything that yields patient readings.
///
/// `poll` may suspend (network, radio) and is bounded by the caller's
/// per-call timeout. `validate` is the device's own plausibility check;
/// readings it rejects are dropped without failing the cycle.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Stable identifier for logging and reading attribution.
    fn device_id(&self) -> &str;

    /// Produce the next reading.
    async fn poll(&self) -> Result<TelemetryReading, SourceError>;

    /// Whether a reading from this device is plausible.
    fn validate(&self, reading: &TelemetryReading) -> bool;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Alert payloads and the vitals threshold policy.
//!
//! The threshold values are configuration, not clinical guidance; the
//! defaults here are deliberately conservative and every deployment is
//! expected to override them per [`crate::config::MonitorConfig`].

use serde::{Deserialize, Serialize};

use crate::risk::RiskAssessment;
use crate::telemetry::TelemetryReading;
use crate::types::{PatientId, Timestamp};

// ---------------------------------------------------------------------------
// Vital metric names
// ---------------------------------------------------------------------------

/// Canonical metric names used in alert payloads and ledger records.
pub mod vital_names {
    pub const HEART_RATE: &str = "heart_rate_bpm";
    pub const TEMPERATURE: &str = "temperature_celsius";
    pub const OXYGEN_SATURATION: &str = "oxygen_saturation_pct";
    pub const RESPIRATORY_RATE: &str = "respiratory_rate";
    pub const SYSTOLIC: &str = "systolic_mmhg";
    pub const RISK_SCORE: &str = "risk_score";
}

// ---------------------------------------------------------------------------
// AlertLevel
// ---------------------------------------------------------------------------

/// Severity of an alert dispatched to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// A vital crossed its configured threshold.
    Warning,
    /// A vital crossed a critical bound or overall risk is critical.
    Critical,
    /// Monitoring itself failed and has stopped — silent loss of
    /// coverage is never acceptable.
    Fatal,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Fatal => "fatal",
        }
    }
}

// ---------------------------------------------------------------------------
// AlertPayload
// ---------------------------------------------------------------------------

/// One alert as delivered to every subscriber of a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub patient_id: PatientId,
    pub level: AlertLevel,
    /// Canonical metric name (see [`vital_names`]), when the alert is
    /// tied to a single measurement.
    pub metric: Option<String>,
    pub observed: Option<f64>,
    pub threshold: Option<f64>,
    pub message: String,
    pub raised_at: Timestamp,
}

impl AlertPayload {
    /// A threshold-violation alert for a single metric.
    pub fn threshold_violation(
        patient_id: PatientId,
        level: AlertLevel,
        metric: &str,
        observed: f64,
        threshold: f64,
    ) -> Self {
        Self {
            patient_id,
            level,
            metric: Some(metric.to_string()),
            observed: Some(observed),
            threshold: Some(threshold),
            message: format!("{metric} at {observed} crossed threshold {threshold}"),
            raised_at: chrono::Utc::now(),
        }
    }

    /// A monitoring-loss alert raised when a task gives up.
    pub fn monitoring_lost(patient_id: PatientId, consecutive_failures: u32) -> Self {
        Self {
            patient_id,
            level: AlertLevel::Fatal,
            metric: None,
            observed: None,
            threshold: None,
            message: format!(
                "continuous monitoring stopped after {consecutive_failures} consecutive cycle failures"
            ),
            raised_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// VitalThresholds
// ---------------------------------------------------------------------------

/// Alerting thresholds for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalThresholds {
    pub heart_rate_high_bpm: u32,
    pub heart_rate_low_bpm: u32,
    pub temperature_high_celsius: f64,
    pub oxygen_saturation_low_pct: u8,
    pub respiratory_rate_high: u32,
    pub systolic_high_mmhg: u32,
    /// Overall risk score at or above which a critical alert is raised.
    pub risk_score_alert: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            heart_rate_high_bpm: 120,
            heart_rate_low_bpm: 45,
            temperature_high_celsius: 38.5,
            oxygen_saturation_low_pct: 92,
            respiratory_rate_high: 24,
            systolic_high_mmhg: 160,
            risk_score_alert: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold policy
// ---------------------------------------------------------------------------

/// Evaluate a single validated reading against the thresholds.
///
/// Returns one alert per violated bound. SpO2 violations are critical;
/// the remaining vitals raise warnings.
pub fn evaluate_reading(
    patient_id: PatientId,
    reading: &TelemetryReading,
    thresholds: &VitalThresholds,
) -> Vec<AlertPayload> {
    let mut alerts = Vec::new();

    if let Some(hr) = reading.heart_rate_bpm {
        if hr > thresholds.heart_rate_high_bpm {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Warning,
                vital_names::HEART_RATE,
                hr as f64,
                thresholds.heart_rate_high_bpm as f64,
            ));
        } else if hr < thresholds.heart_rate_low_bpm {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Warning,
                vital_names::HEART_RATE,
                hr as f64,
                thresholds.heart_rate_low_bpm as f64,
            ));
        }
    }

    if let Some(temp) = reading.temperature_celsius {
        if temp > thresholds.temperature_high_celsius {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Warning,
                vital_names::TEMPERATURE,
                temp,
                thresholds.temperature_high_celsius,
            ));
        }
    }

    if let Some(spo2) = reading.oxygen_saturation_pct {
        if spo2 < thresholds.oxygen_saturation_low_pct {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Critical,
                vital_names::OXYGEN_SATURATION,
                spo2 as f64,
                thresholds.oxygen_saturation_low_pct as f64,
            ));
        }
    }

    if let Some(rr) = reading.respiratory_rate {
        if rr > thresholds.respiratory_rate_high {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Warning,
                vital_names::RESPIRATORY_RATE,
                rr as f64,
                thresholds.respiratory_rate_high as f64,
            ));
        }
    }

    if let Some(sys) = reading.systolic_mmhg {
        if sys > thresholds.systolic_high_mmhg {
            alerts.push(AlertPayload::threshold_violation(
                patient_id,
                AlertLevel::Warning,
                vital_names::SYSTOLIC,
                sys as f64,
                thresholds.systolic_high_mmhg as f64,
            ));
        }
    }

    alerts
}

/// Raise a critical alert when the overall risk score crosses the
/// configured bound.
pub fn evaluate_risk(
    patient_id: PatientId,
    assessment: &RiskAssessment,
    thresholds: &VitalThresholds,
) -> Option<AlertPayload> {
    if assessment.overall_score >= thresholds.risk_score_alert {
        Some(AlertPayload::threshold_violation(
            patient_id,
            AlertLevel::Critical,
            vital_names::RISK_SCORE,
            assessment.overall_score,
            thresholds.risk_score_alert,
        ))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

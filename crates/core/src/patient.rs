//! Patient and provider profiles plus registration input validation.
//!
//! [`Biometrics`] snapshots are immutable once created; a patient's
//! history only ever grows by appending new snapshots through the
//! registry. Registration input is validated with plain functions
//! returning [`CoreError::Validation`] so the rules are usable from
//! both the facade and any future API layer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{PatientId, ProviderId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a patient or provider name.
const MAX_NAME_LEN: usize = 256;

/// Maximum number of entries in a list field (allergies, conditions,
/// medications, credentials).
const MAX_LIST_LEN: usize = 128;

/// ABO/Rh blood types accepted at registration.
pub const VALID_BLOOD_TYPES: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

// ---------------------------------------------------------------------------
// Biometrics
// ---------------------------------------------------------------------------

/// One point-in-time snapshot of vital measurements.
///
/// Immutable once created — appended to a patient's history, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Biometrics {
    /// Systolic/diastolic reading, e.g. `"120/80"`.
    pub blood_pressure: String,
    pub heart_rate_bpm: u32,
    pub temperature_celsius: f64,
    pub oxygen_saturation_pct: u8,
    pub respiratory_rate: u32,
    /// Not every capture includes a glucose measurement.
    pub glucose_level: Option<f64>,
    pub bmi: Option<f64>,
    /// Raw ECG samples, when the capturing device produces them.
    pub ecg_samples: Option<Vec<f64>>,
    pub stress_level: Option<f64>,
    /// When the snapshot was captured (UTC).
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

/// A registered patient: identity, clinical profile, and a
/// chronologically ordered history of biometric snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub blood_type: String,
    pub allergies: Vec<String>,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    /// Marker name to variant mapping, when genetic screening data exists.
    pub genetic_markers: Option<BTreeMap<String, String>>,
    /// Append-only, chronologically ordered.
    pub biometric_history: Vec<Biometrics>,
}

// ---------------------------------------------------------------------------
// HealthcareProvider
// ---------------------------------------------------------------------------

/// A registered healthcare provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthcareProvider {
    pub id: ProviderId,
    pub name: String,
    pub specialization: String,
    pub credentials: Vec<String>,
    /// Aggregate rating in `0.0..=5.0`.
    pub rating: f64,
    pub contact_info: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Registration input
// ---------------------------------------------------------------------------

/// Input for registering a new patient.
///
/// `dob` is an ISO-8601 calendar date (`YYYY-MM-DD`); it is parsed and
/// range-checked by [`RegisterPatientRequest::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPatientRequest {
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub blood_type: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub genetic_markers: Option<BTreeMap<String, String>>,
}

impl RegisterPatientRequest {
    /// Validate required fields and return the parsed date of birth.
    ///
    /// Rules:
    /// - `name` must be non-empty and at most `MAX_NAME_LEN` characters.
    /// - `dob` must parse as `YYYY-MM-DD` and must not be in the future.
    /// - `blood_type` must be one of [`VALID_BLOOD_TYPES`].
    /// - List fields must contain no empty or duplicate entries.
    pub fn validate(&self) -> Result<NaiveDate, CoreError> {
        validate_name(&self.name)?;

        let dob = NaiveDate::parse_from_str(&self.dob, "%Y-%m-%d").map_err(|_| {
            CoreError::Validation(format!("dob must be an ISO date (YYYY-MM-DD), got '{}'", self.dob))
        })?;
        if dob > chrono::Utc::now().date_naive() {
            return Err(CoreError::Validation(
                "dob must not be in the future".to_string(),
            ));
        }

        if self.gender.is_empty() {
            return Err(CoreError::Validation("gender must not be empty".to_string()));
        }

        validate_blood_type(&self.blood_type)?;
        validate_list(&self.allergies, "allergies")?;
        validate_list(&self.conditions, "conditions")?;
        validate_list(&self.medications, "medications")?;

        Ok(dob)
    }

    /// Build the immutable [`Patient`] for an allocated id.
    ///
    /// Call [`validate`](Self::validate) first; this consumes the parsed
    /// date of birth it returned.
    pub fn into_patient(self, id: PatientId, dob: NaiveDate) -> Patient {
        Patient {
            id,
            name: self.name,
            dob,
            gender: self.gender,
            blood_type: self.blood_type,
            allergies: self.allergies,
            conditions: self.conditions,
            medications: self.medications,
            genetic_markers: self.genetic_markers,
            biometric_history: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a patient or provider name.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate that a blood type string is one of the known ABO/Rh types.
pub fn validate_blood_type(bt: &str) -> Result<(), CoreError> {
    if VALID_BLOOD_TYPES.contains(&bt) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown blood type: '{bt}'. Valid types: {}",
            VALID_BLOOD_TYPES.join(", ")
        )))
    }
}

/// Validate a clinical list field (allergies, conditions, medications).
///
/// Rules: at most `MAX_LIST_LEN` entries, no empty entries, no duplicates.
pub fn validate_list(entries: &[String], field: &str) -> Result<(), CoreError> {
    if entries.len() > MAX_LIST_LEN {
        return Err(CoreError::Validation(format!(
            "{field} may have at most {MAX_LIST_LEN} entries"
        )));
    }
    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if entry.is_empty() {
            return Err(CoreError::Validation(format!(
                "{field} entry at index {i} must not be empty"
            )));
        }
        if !seen.insert(entry.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate {field} entry: \"{entry}\""
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Ledger record kinds.
//!
//! A closed tagged union over the four record kinds, each carrying a
//! strongly-typed payload. Records are immutable once constructed and
//! serialize deterministically (struct field order plus `BTreeMap`
//! payloads) so block hashing is stable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vigil_core::alert::AlertPayload;
use vigil_core::risk::RiskAssessment;
use vigil_core::telemetry::Observation;
use vigil_core::types::{PatientId, Timestamp};

// ---------------------------------------------------------------------------
// RegisteredProfile
// ---------------------------------------------------------------------------

/// Registration summary captured in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredProfile {
    pub name: String,
    pub dob: NaiveDate,
    pub blood_type: String,
}

// ---------------------------------------------------------------------------
// LedgerRecord
// ---------------------------------------------------------------------------

/// One auditable event, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerRecord {
    /// A patient entered the system.
    PatientRegistered {
        patient_id: PatientId,
        created_at: Timestamp,
        profile: RegisteredProfile,
    },
    /// One completed monitoring cycle: the combined observation and
    /// the risk verdict it produced.
    MonitoringObservation {
        patient_id: PatientId,
        created_at: Timestamp,
        observation: Observation,
        assessment: RiskAssessment,
    },
    /// An alert was raised and dispatched.
    Alert {
        patient_id: PatientId,
        created_at: Timestamp,
        alert: AlertPayload,
    },
    /// Anything else worth auditing (task lifecycle events, manual
    /// annotations).
    Generic {
        patient_id: PatientId,
        created_at: Timestamp,
        label: String,
        payload: serde_json::Value,
    },
}

impl LedgerRecord {
    /// The patient this record refers to.
    pub fn patient_id(&self) -> PatientId {
        match self {
            LedgerRecord::PatientRegistered { patient_id, .. }
            | LedgerRecord::MonitoringObservation { patient_id, .. }
            | LedgerRecord::Alert { patient_id, .. }
            | LedgerRecord::Generic { patient_id, .. } => *patient_id,
        }
    }

    /// When the record was constructed.
    pub fn created_at(&self) -> Timestamp {
        match self {
            LedgerRecord::PatientRegistered { created_at, .. }
            | LedgerRecord::MonitoringObservation { created_at, .. }
            | LedgerRecord::Alert { created_at, .. }
            | LedgerRecord::Generic { created_at, .. } => *created_at,
        }
    }

    /// Kind tag as it appears in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerRecord::PatientRegistered { .. } => "patient_registered",
            LedgerRecord::MonitoringObservation { .. } => "monitoring_observation",
            LedgerRecord::Alert { .. } => "alert",
            LedgerRecord::Generic { .. } => "generic",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

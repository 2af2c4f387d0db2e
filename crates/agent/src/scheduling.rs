//! Appointment criteria, proposals, and the optimizer boundary.
//!
//! Scheduling strategy is pluggable: the facade hands a snapshot of
//! registered providers to an [`AppointmentOptimizer`] and records the
//! proposal it returns. The shipped [`FirstSlotOptimizer`]
//! (in [`crate::sim`]) is deliberately simple; a deployment can swap
//! in anything that implements the trait.

use serde::{Deserialize, Serialize};

use vigil_core::patient::HealthcareProvider;
use vigil_core::types::{PatientId, ProviderId, Timestamp};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Scheduling urgency, from routine follow-up to immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria and proposal
// ---------------------------------------------------------------------------

/// What the caller wants scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentCriteria {
    pub patient_id: PatientId,
    /// Required provider specialization, matched case-insensitively.
    pub specialization: String,
    pub priority: Priority,
    /// No proposal may be earlier than this.
    pub earliest: Timestamp,
}

/// A concrete slot with a concrete provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentProposal {
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub scheduled_for: Timestamp,
    pub priority: Priority,
}

// ---------------------------------------------------------------------------
// Optimizer boundary
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("no registered provider matches specialization '{0}'")]
    NoMatchingProvider(String),
}

/// Strategy for turning criteria plus a provider snapshot into a
/// proposal.
#[async_trait::async_trait]
pub trait AppointmentOptimizer: Send + Sync {
    async fn schedule(
        &self,
        criteria: &AppointmentCriteria,
        providers: &[HealthcareProvider],
    ) -> Result<AppointmentProposal, SchedulingError>;
}

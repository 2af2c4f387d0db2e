//! One monitoring cycle: poll → validate → evaluate → alert → record.
//!
//! The cycle body is a free function over [`CycleDeps`] so the
//! supervisor's per-patient tasks and tests share the exact same path.
//! Source failures degrade the cycle (the reading is skipped); only a
//! cycle with zero usable readings, a missing patient, an evaluator
//! failure, or a ledger failure fails outright.

use std::sync::Arc;
use std::time::Duration;

use vigil_core::alert::{self, AlertPayload, VitalThresholds};
use vigil_core::registry::PatientRegistry;
use vigil_core::risk::{EvaluatorError, RiskAssessment, RiskEvaluator};
use vigil_core::telemetry::{Observation, TelemetryReading, TelemetrySource};
use vigil_core::types::PatientId;
use vigil_ledger::{Ledger, LedgerError, LedgerRecord};

use crate::router::AlertRouter;

// ---------------------------------------------------------------------------
// CycleError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Every source failed, timed out, or produced an implausible
    /// reading — there is nothing to evaluate.
    #[error("no valid readings were collected this cycle")]
    NoValidReadings,

    /// The patient disappeared from the registry mid-monitoring.
    #[error("patient {0} is no longer registered")]
    PatientMissing(PatientId),

    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// The evaluator exceeded the per-call bound.
    #[error("risk evaluation timed out")]
    EvaluatorTimeout,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What a successful cycle produced, for logging and tests.
#[derive(Debug)]
pub struct CycleOutcome {
    pub readings_collected: usize,
    pub assessment: RiskAssessment,
    pub alerts_raised: usize,
}

// ---------------------------------------------------------------------------
// CycleDeps
// ---------------------------------------------------------------------------

/// Everything one cycle needs, shared by the owning task.
pub struct CycleDeps {
    pub patient_id: PatientId,
    pub sources: Vec<Arc<dyn TelemetrySource>>,
    pub registry: Arc<PatientRegistry>,
    pub evaluator: Arc<dyn RiskEvaluator>,
    pub router: Arc<AlertRouter>,
    pub ledger: Arc<Ledger>,
    pub thresholds: VitalThresholds,
    /// Upper bound on a single source poll or evaluator call.
    pub call_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Cycle body
// ---------------------------------------------------------------------------

/// Run one full monitoring cycle for a patient.
///
/// Ledger records are appended only after evaluation and dispatch have
/// both finished, so a cycle either lands in the audit trail complete
/// (observation plus any alerts) or not at all.
pub async fn run_cycle(deps: &CycleDeps) -> Result<CycleOutcome, CycleError> {
    let readings = collect_readings(deps).await;
    if readings.is_empty() {
        return Err(CycleError::NoValidReadings);
    }

    // Clone the profile before any await so no registry lock is held
    // across suspension points.
    let patient = deps
        .registry
        .get(&deps.patient_id)
        .ok_or(CycleError::PatientMissing(deps.patient_id))?;

    let observation = Observation::new(deps.patient_id, readings);

    let assessment = match tokio::time::timeout(
        deps.call_timeout,
        deps.evaluator.evaluate(&patient, Some(&observation)),
    )
    .await
    {
        Ok(result) => result?,
        Err(_elapsed) => return Err(CycleError::EvaluatorTimeout),
    };

    let mut alerts: Vec<AlertPayload> = Vec::new();
    for reading in &observation.readings {
        alerts.extend(alert::evaluate_reading(
            deps.patient_id,
            reading,
            &deps.thresholds,
        ));
    }
    if let Some(risk_alert) = alert::evaluate_risk(deps.patient_id, &assessment, &deps.thresholds) {
        alerts.push(risk_alert);
    }

    // Delivery failures are already logged per attempt by the router;
    // they never fail the cycle.
    if !alerts.is_empty() {
        let report = deps.router.dispatch(deps.patient_id, &alerts).await;
        if !report.is_fully_delivered() {
            tracing::warn!(
                patient_id = %deps.patient_id,
                failed = report.failed(),
                "Some alert deliveries failed this cycle"
            );
        }
    }

    deps.ledger.add_record(LedgerRecord::MonitoringObservation {
        patient_id: deps.patient_id,
        created_at: observation.collected_at,
        observation: observation.clone(),
        assessment: assessment.clone(),
    })?;
    for raised in &alerts {
        deps.ledger.add_record(LedgerRecord::Alert {
            patient_id: deps.patient_id,
            created_at: raised.raised_at,
            alert: raised.clone(),
        })?;
    }

    Ok(CycleOutcome {
        readings_collected: observation.readings.len(),
        assessment,
        alerts_raised: alerts.len(),
    })
}

/// Poll every source, dropping failures, timeouts, and readings the
/// device itself rejects.
async fn collect_readings(deps: &CycleDeps) -> Vec<TelemetryReading> {
    let mut readings = Vec::with_capacity(deps.sources.len());

    for source in &deps.sources {
        match tokio::time::timeout(deps.call_timeout, source.poll()).await {
            Ok(Ok(reading)) => {
                if source.validate(&reading) {
                    readings.push(reading);
                } else {
                    tracing::warn!(
                        patient_id = %deps.patient_id,
                        device_id = source.device_id(),
                        "Device rejected its own reading as implausible; skipping"
                    );
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    patient_id = %deps.patient_id,
                    device_id = source.device_id(),
                    error = %e,
                    "Telemetry poll failed; skipping device this cycle"
                );
            }
            Err(_elapsed) => {
                tracing::warn!(
                    patient_id = %deps.patient_id,
                    device_id = source.device_id(),
                    "Telemetry poll timed out; skipping device this cycle"
                );
            }
        }
    }

    readings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

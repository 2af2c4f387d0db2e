//! [`CareAgent`] — the single facade over registries, ledger,
//! monitoring, alerting, and scheduling.
//!
//! The facade owns one instance of every shared component and hands
//! the same `Arc`s to the monitoring supervisor, so a synchronous
//! query and a running cycle always observe identical state. Callers
//! never touch the registries or the router directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_core::alert::AlertPayload;
use vigil_core::config::MonitorConfig;
use vigil_core::error::CoreError;
use vigil_core::patient::{
    validate_list, validate_name, Biometrics, HealthcareProvider, Patient, RegisterPatientRequest,
};
use vigil_core::registry::{PatientRegistry, ProviderRegistry};
use vigil_core::risk::{EvaluatorError, RiskAssessment, RiskEvaluator};
use vigil_core::telemetry::TelemetrySource;
use vigil_core::types::{PatientId, ProviderId, SubscriberId};
use vigil_ledger::{Ledger, LedgerBlock, LedgerError, LedgerRecord, RegisteredProfile, SealOutcome};
use vigil_monitor::router::{AlertRouter, NotificationTransport};
use vigil_monitor::sealer::run_seal_loop;
use vigil_monitor::supervisor::{MonitoringSupervisor, StartOutcome, TaskState};

use crate::scheduling::{
    AppointmentCriteria, AppointmentOptimizer, AppointmentProposal, SchedulingError,
};

// ---------------------------------------------------------------------------
// AgentError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

/// What a registration produced.
///
/// `audited` is `false` when the patient entered the registry but the
/// ledger refused the registration record (halted after an integrity
/// failure). The patient is fully usable either way; the gap is in the
/// audit trail, and it is reported rather than hidden.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub patient_id: PatientId,
    pub audited: bool,
}

// ---------------------------------------------------------------------------
// CareAgent
// ---------------------------------------------------------------------------

/// The facade callers program against.
pub struct CareAgent {
    patients: Arc<PatientRegistry>,
    providers: Arc<ProviderRegistry>,
    ledger: Arc<Ledger>,
    router: Arc<AlertRouter>,
    supervisor: MonitoringSupervisor,
    evaluator: Arc<dyn RiskEvaluator>,
    optimizer: Arc<dyn AppointmentOptimizer>,
    config: MonitorConfig,
}

impl CareAgent {
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        evaluator: Arc<dyn RiskEvaluator>,
        optimizer: Arc<dyn AppointmentOptimizer>,
        config: MonitorConfig,
    ) -> Self {
        let patients = Arc::new(PatientRegistry::new());
        let providers = Arc::new(ProviderRegistry::new());
        let ledger = Arc::new(Ledger::new());
        let router = Arc::new(AlertRouter::new(transport));
        let supervisor = MonitoringSupervisor::new(
            Arc::clone(&patients),
            Arc::clone(&evaluator),
            Arc::clone(&router),
            Arc::clone(&ledger),
            config.clone(),
        );
        Self {
            patients,
            providers,
            ledger,
            router,
            supervisor,
            evaluator,
            optimizer,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Validate and register a new patient.
    ///
    /// The registry insert and the audit record are not atomic: if the
    /// ledger is halted the patient is still registered and the
    /// outcome says `audited: false`.
    pub fn register_patient(
        &self,
        request: RegisterPatientRequest,
    ) -> Result<RegistrationOutcome, AgentError> {
        let dob = request.validate()?;
        let patient_id = uuid::Uuid::new_v4();
        let patient = request.into_patient(patient_id, dob);

        let profile = RegisteredProfile {
            name: patient.name.clone(),
            dob: patient.dob,
            blood_type: patient.blood_type.clone(),
        };
        self.patients.insert(patient);

        let audited = match self.ledger.add_record(LedgerRecord::PatientRegistered {
            patient_id,
            created_at: chrono::Utc::now(),
            profile,
        }) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    patient_id = %patient_id,
                    error = %e,
                    "Patient registered but the audit record was refused"
                );
                false
            }
        };

        tracing::info!(patient_id = %patient_id, audited, "Registered patient");
        Ok(RegistrationOutcome {
            patient_id,
            audited,
        })
    }

    /// Register a healthcare provider.
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        specialization: impl Into<String>,
        credentials: Vec<String>,
        rating: f64,
        contact_info: BTreeMap<String, String>,
    ) -> Result<ProviderId, AgentError> {
        let name = name.into();
        let specialization = specialization.into();
        validate_name(&name)?;
        validate_list(&credentials, "credentials")?;
        if specialization.is_empty() {
            return Err(CoreError::Validation("specialization must not be empty".to_string()).into());
        }
        if !(0.0..=5.0).contains(&rating) {
            return Err(CoreError::Validation(format!(
                "rating must be within 0.0..=5.0, got {rating}"
            ))
            .into());
        }

        let provider_id = uuid::Uuid::new_v4();
        self.providers.insert(HealthcareProvider {
            id: provider_id,
            name,
            specialization,
            credentials,
            rating,
            contact_info,
        });
        tracing::info!(provider_id = %provider_id, "Registered provider");
        Ok(provider_id)
    }

    /// Snapshot of a patient's current profile and history.
    pub fn patient(&self, patient_id: &PatientId) -> Result<Patient, AgentError> {
        self.patients.get(patient_id).ok_or_else(|| {
            AgentError::Core(CoreError::NotFound {
                entity: "patient",
                id: *patient_id,
            })
        })
    }

    // -----------------------------------------------------------------------
    // Biometrics
    // -----------------------------------------------------------------------

    /// Append a biometric snapshot to a patient's history and audit it.
    ///
    /// Like registration, the audit record is best-effort when the
    /// ledger is halted; the history append is the source of truth.
    pub fn record_biometrics(
        &self,
        patient_id: &PatientId,
        snapshot: Biometrics,
    ) -> Result<(), AgentError> {
        self.patients.append_biometrics(patient_id, snapshot.clone())?;

        let payload = serde_json::to_value(&snapshot)
            .expect("biometric snapshots are always serialisable");
        if let Err(e) = self.ledger.add_record(LedgerRecord::Generic {
            patient_id: *patient_id,
            created_at: snapshot.recorded_at,
            label: "biometrics_recorded".to_string(),
            payload,
        }) {
            tracing::error!(
                patient_id = %patient_id,
                error = %e,
                "Biometrics stored but the audit record was refused"
            );
        }
        Ok(())
    }

    /// Record a newly diagnosed condition on a patient's profile.
    pub fn add_condition(
        &self,
        patient_id: &PatientId,
        condition: impl Into<String>,
    ) -> Result<(), AgentError> {
        let condition = condition.into();
        self.patients.add_condition(patient_id, condition.clone())?;
        self.audit_profile_update(patient_id, "condition_added", &condition);
        Ok(())
    }

    /// Record a newly prescribed medication on a patient's profile.
    pub fn add_medication(
        &self,
        patient_id: &PatientId,
        medication: impl Into<String>,
    ) -> Result<(), AgentError> {
        let medication = medication.into();
        self.patients.add_medication(patient_id, medication.clone())?;
        self.audit_profile_update(patient_id, "medication_added", &medication);
        Ok(())
    }

    fn audit_profile_update(&self, patient_id: &PatientId, label: &str, value: &str) {
        if let Err(e) = self.ledger.add_record(LedgerRecord::Generic {
            patient_id: *patient_id,
            created_at: chrono::Utc::now(),
            label: label.to_string(),
            payload: serde_json::json!({ "value": value }),
        }) {
            tracing::error!(
                patient_id = %patient_id,
                error = %e,
                "Profile updated but the audit record was refused"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Alert subscriptions
    // -----------------------------------------------------------------------

    /// Subscribe an identity to a patient's alerts.
    pub fn subscribe_alerts(
        &self,
        patient_id: PatientId,
        subscriber: SubscriberId,
    ) -> Result<(), AgentError> {
        if !self.patients.contains(&patient_id) {
            return Err(CoreError::NotFound {
                entity: "patient",
                id: patient_id,
            }
            .into());
        }
        self.router.subscribe(patient_id, subscriber);
        Ok(())
    }

    /// Remove an alert subscription; unknown pairs are a no-op.
    pub fn unsubscribe_alerts(&self, patient_id: &PatientId, subscriber: &SubscriberId) {
        self.router.unsubscribe(patient_id, subscriber);
    }

    // -----------------------------------------------------------------------
    // Monitoring lifecycle
    // -----------------------------------------------------------------------

    /// Start continuous monitoring for a patient with the given devices.
    pub fn start_monitoring(
        &self,
        patient_id: PatientId,
        sources: Vec<Arc<dyn TelemetrySource>>,
    ) -> Result<StartOutcome, AgentError> {
        Ok(self.supervisor.start(patient_id, sources)?)
    }

    /// Request a cooperative stop of a patient's monitoring task.
    pub fn stop_monitoring(&self, patient_id: &PatientId) -> Result<(), AgentError> {
        Ok(self.supervisor.stop(patient_id)?)
    }

    /// Current task state, or `None` when the patient was never started.
    pub fn monitoring_state(&self, patient_id: &PatientId) -> Option<TaskState> {
        self.supervisor.state(patient_id)
    }

    /// Wait until a patient's monitoring task has fully exited.
    pub async fn wait_until_stopped(&self, patient_id: &PatientId) {
        self.supervisor.wait_until_stopped(patient_id).await;
    }

    /// Stop every monitoring task and wait for each to exit.
    pub async fn shutdown_monitoring(&self) {
        self.supervisor.stop_all().await;
    }

    /// Spawn the periodic seal loop on the configured interval.
    pub fn spawn_sealer(
        &self,
        cancel: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(run_seal_loop(
            Arc::clone(&self.ledger),
            self.config.seal_interval,
            cancel,
        ))
    }

    // -----------------------------------------------------------------------
    // Risk
    // -----------------------------------------------------------------------

    /// Synchronous risk query over the patient's stored profile and
    /// history — the same registry state a running cycle sees, without
    /// waiting for one.
    pub async fn predict_risk(&self, patient_id: &PatientId) -> Result<RiskAssessment, AgentError> {
        let patient = self.patient(patient_id)?;
        match tokio::time::timeout(
            self.config.call_timeout,
            self.evaluator.evaluate(&patient, None),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_elapsed) => Err(EvaluatorError::Unavailable(
                "risk evaluation timed out".to_string(),
            )
            .into()),
        }
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Propose an appointment and audit the proposal.
    pub async fn schedule_appointment(
        &self,
        criteria: AppointmentCriteria,
    ) -> Result<AppointmentProposal, AgentError> {
        if !self.patients.contains(&criteria.patient_id) {
            return Err(CoreError::NotFound {
                entity: "patient",
                id: criteria.patient_id,
            }
            .into());
        }

        let providers = self.providers.all();
        let proposal = self.optimizer.schedule(&criteria, &providers).await?;

        let payload = serde_json::to_value(&proposal)
            .expect("appointment proposals are always serialisable");
        if let Err(e) = self.ledger.add_record(LedgerRecord::Generic {
            patient_id: proposal.patient_id,
            created_at: chrono::Utc::now(),
            label: "appointment_scheduled".to_string(),
            payload,
        }) {
            tracing::error!(
                patient_id = %proposal.patient_id,
                error = %e,
                "Appointment scheduled but the audit record was refused"
            );
        }

        tracing::info!(
            patient_id = %proposal.patient_id,
            provider = %proposal.provider_name,
            scheduled_for = %proposal.scheduled_for,
            "Scheduled appointment"
        );
        Ok(proposal)
    }

    // -----------------------------------------------------------------------
    // Ledger access
    // -----------------------------------------------------------------------

    /// Seal the pending buffer into a new block immediately.
    pub fn seal_ledger(&self) -> Result<SealOutcome, AgentError> {
        Ok(self.ledger.seal_block()?)
    }

    /// Snapshot of the sealed chain.
    pub fn ledger_blocks(&self) -> Result<Vec<LedgerBlock>, AgentError> {
        Ok(self.ledger.blocks()?)
    }

    /// Verify the whole chain; a failure halts the ledger.
    pub fn verify_ledger(&self) -> Result<(), AgentError> {
        Ok(self.ledger.verify_chain()?)
    }

    /// Dispatch an ad-hoc alert to a patient's subscribers.
    ///
    /// For operator-initiated notifications; monitoring cycles dispatch
    /// their own alerts.
    pub async fn raise_alert(&self, alert: AlertPayload) -> Result<(), AgentError> {
        let patient_id = alert.patient_id;
        if !self.patients.contains(&patient_id) {
            return Err(CoreError::NotFound {
                entity: "patient",
                id: patient_id,
            }
            .into());
        }
        self.router.dispatch(patient_id, &[alert.clone()]).await;
        if let Err(e) = self.ledger.add_record(LedgerRecord::Alert {
            patient_id,
            created_at: alert.raised_at,
            alert,
        }) {
            tracing::error!(patient_id = %patient_id, error = %e, "Alert dispatched but not audited");
        }
        Ok(())
    }
}

//! Facade-level scenarios: registration to sealed audit trail,
//! monitoring lifecycle, risk queries, scheduling, and ad-hoc alerts.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;

use vigil_agent::facade::{AgentError, CareAgent};
use vigil_agent::scheduling::{AppointmentCriteria, Priority};
use vigil_agent::sim::{BaselineRiskEvaluator, FirstSlotOptimizer, SimulatedWearable};
use vigil_core::alert::{AlertLevel, AlertPayload};
use vigil_core::config::MonitorConfig;
use vigil_core::error::CoreError;
use vigil_core::patient::{Biometrics, RegisterPatientRequest};
use vigil_core::risk::RiskLevel;
use vigil_core::telemetry::TelemetrySource;
use vigil_core::types::{PatientId, SubscriberId};
use vigil_ledger::{LedgerBlock, LedgerRecord, SealOutcome};
use vigil_monitor::router::{DeliveryError, NotificationTransport};
use vigil_monitor::supervisor::{StartOutcome, TaskState};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingTransport {
    delivered: Mutex<Vec<(SubscriberId, AlertPayload)>>,
}

#[async_trait::async_trait]
impl NotificationTransport for RecordingTransport {
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        alert: &AlertPayload,
    ) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .unwrap()
            .push((subscriber, alert.clone()));
        Ok(())
    }
}

fn agent_with(transport: Arc<RecordingTransport>) -> CareAgent {
    let config = MonitorConfig {
        cycle_period: Duration::from_secs(1),
        ..MonitorConfig::default()
    };
    CareAgent::new(
        transport,
        Arc::new(BaselineRiskEvaluator),
        Arc::new(FirstSlotOptimizer),
        config,
    )
}

fn agent() -> CareAgent {
    agent_with(Arc::new(RecordingTransport::default()))
}

fn john_doe() -> RegisterPatientRequest {
    RegisterPatientRequest {
        name: "John Doe".to_string(),
        dob: "1980-05-15".to_string(),
        gender: "M".to_string(),
        blood_type: "A+".to_string(),
        allergies: vec!["penicillin".to_string()],
        conditions: vec!["hypertension".to_string()],
        medications: vec!["lisinopril".to_string()],
        genetic_markers: None,
    }
}

fn snapshot(heart_rate: u32) -> Biometrics {
    Biometrics {
        blood_pressure: "130/85".to_string(),
        heart_rate_bpm: heart_rate,
        temperature_celsius: 36.8,
        oxygen_saturation_pct: 98,
        respiratory_rate: 14,
        glucose_level: None,
        bmi: None,
        ecg_samples: None,
        stress_level: Some(0.3),
        recorded_at: chrono::Utc::now(),
    }
}

fn sealed(agent: &CareAgent) -> LedgerBlock {
    match agent.seal_ledger().unwrap() {
        SealOutcome::Sealed(block) => block,
        SealOutcome::NothingToSeal => panic!("expected pending records to seal"),
    }
}

fn wearable() -> Vec<Arc<dyn TelemetrySource>> {
    vec![Arc::new(SimulatedWearable::new("watch-1", 0.0))]
}

// ---------------------------------------------------------------------------
// Registration and audit trail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_lands_in_the_first_sealed_block() {
    let agent = agent();
    let outcome = agent.register_patient(john_doe()).unwrap();
    assert!(outcome.audited);

    let block = sealed(&agent);
    assert_eq!(block.index, 0);
    assert_eq!(block.records.len(), 1);
    assert_matches!(
        &block.records[0],
        LedgerRecord::PatientRegistered { patient_id, profile, .. }
            if *patient_id == outcome.patient_id && profile.name == "John Doe"
    );
    assert!(agent.verify_ledger().is_ok());
}

#[tokio::test]
async fn invalid_registration_changes_nothing() {
    let agent = agent();
    let mut request = john_doe();
    request.blood_type = "C+".to_string();

    let err = agent.register_patient(request).unwrap_err();
    assert_matches!(err, AgentError::Core(CoreError::Validation(_)));
    assert_matches!(agent.seal_ledger().unwrap(), SealOutcome::NothingToSeal);
}

#[tokio::test]
async fn biometrics_grow_history_and_are_audited() {
    let agent = agent();
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;

    agent.record_biometrics(&patient_id, snapshot(70)).unwrap();
    agent.record_biometrics(&patient_id, snapshot(76)).unwrap();

    let history = agent.patient(&patient_id).unwrap().biometric_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].heart_rate_bpm, 70);
    assert_eq!(history[1].heart_rate_bpm, 76);

    let block = sealed(&agent);
    let biometric_records = block
        .records
        .iter()
        .filter(|r| matches!(r, LedgerRecord::Generic { label, .. } if label == "biometrics_recorded"))
        .count();
    assert_eq!(biometric_records, 2);
}

#[tokio::test]
async fn profile_updates_deduplicate_and_are_audited() {
    let agent = agent();
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;

    agent.add_condition(&patient_id, "atrial fibrillation").unwrap();
    agent.add_condition(&patient_id, "atrial fibrillation").unwrap();
    agent.add_medication(&patient_id, "apixaban").unwrap();

    let patient = agent.patient(&patient_id).unwrap();
    assert_eq!(
        patient.conditions,
        vec!["hypertension", "atrial fibrillation"]
    );
    assert!(patient.medications.contains(&"apixaban".to_string()));

    let block = sealed(&agent);
    assert!(block.records.iter().any(|r| matches!(
        r,
        LedgerRecord::Generic { label, .. } if label == "condition_added"
    )));
    assert!(block.records.iter().any(|r| matches!(
        r,
        LedgerRecord::Generic { label, .. } if label == "medication_added"
    )));
}

#[tokio::test]
async fn biometrics_for_unknown_patient_are_rejected() {
    let agent = agent();
    let err = agent
        .record_biometrics(&uuid::Uuid::new_v4(), snapshot(70))
        .unwrap_err();
    assert_matches!(err, AgentError::Core(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[tokio::test]
async fn predict_risk_uses_the_stored_profile() {
    let agent = agent();
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;
    agent.record_biometrics(&patient_id, snapshot(72)).unwrap();

    let assessment = agent.predict_risk(&patient_id).await.unwrap();
    // Hypertension plus mild stress: above zero but nowhere near high.
    assert!(assessment.overall_score > 0.0);
    assert_eq!(assessment.level(), RiskLevel::Low);
    assert!(assessment.medical.contains_key("hypertension"));
}

#[tokio::test]
async fn predict_risk_for_unknown_patient_is_not_found() {
    let agent = agent();
    let err = agent.predict_risk(&uuid::Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, AgentError::Core(CoreError::NotFound { entity: "patient", .. }));
}

// ---------------------------------------------------------------------------
// Monitoring lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn monitoring_lifecycle_through_the_facade() {
    let agent = agent();
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;

    let outcome = agent.start_monitoring(patient_id, wearable()).unwrap();
    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(agent.monitoring_state(&patient_id), Some(TaskState::Running));

    // Starting twice never spawns a second task.
    let outcome = agent.start_monitoring(patient_id, wearable()).unwrap();
    assert_eq!(outcome, StartOutcome::AlreadyRunning);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    agent.stop_monitoring(&patient_id).unwrap();
    agent.wait_until_stopped(&patient_id).await;
    assert_eq!(agent.monitoring_state(&patient_id), Some(TaskState::Stopped));

    let block = sealed(&agent);
    let observations = block
        .records
        .iter()
        .filter(|r| matches!(r, LedgerRecord::MonitoringObservation { .. }))
        .count();
    assert!(observations >= 2);
    assert!(agent.verify_ledger().is_ok());
}

#[tokio::test(start_paused = true)]
async fn monitoring_an_unknown_patient_is_rejected() {
    let agent = agent();
    let err = agent
        .start_monitoring(uuid::Uuid::new_v4(), wearable())
        .unwrap_err();
    assert_matches!(err, AgentError::Core(CoreError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn two_patients_leave_interleaved_but_attributable_records() {
    let agent = agent();
    let first = agent.register_patient(john_doe()).unwrap().patient_id;
    let mut request = john_doe();
    request.name = "Jane Roe".to_string();
    let second = agent.register_patient(request).unwrap().patient_id;

    agent.start_monitoring(first, wearable()).unwrap();
    agent.start_monitoring(second, wearable()).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    agent.shutdown_monitoring().await;

    let block = sealed(&agent);
    let count_for = |id: PatientId| {
        block
            .records
            .iter()
            .filter(|r| {
                matches!(r, LedgerRecord::MonitoringObservation { .. }) && r.patient_id() == id
            })
            .count()
    };
    assert!(count_for(first) >= 2);
    assert!(count_for(second) >= 2);
    assert!(agent.verify_ledger().is_ok());
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduling_picks_a_matching_provider_and_audits() {
    let agent = agent();
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;
    agent
        .register_provider(
            "Dr. Sarah Chen",
            "cardiology",
            vec!["MD".to_string()],
            4.8,
            BTreeMap::new(),
        )
        .unwrap();

    let proposal = agent
        .schedule_appointment(AppointmentCriteria {
            patient_id,
            specialization: "cardiology".to_string(),
            priority: Priority::High,
            earliest: chrono::Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(proposal.provider_name, "Dr. Sarah Chen");

    let block = sealed(&agent);
    assert!(block.records.iter().any(|r| matches!(
        r,
        LedgerRecord::Generic { label, .. } if label == "appointment_scheduled"
    )));
}

#[tokio::test]
async fn provider_rating_out_of_range_is_rejected() {
    let agent = agent();
    let err = agent
        .register_provider("Dr. X", "cardiology", vec![], 7.5, BTreeMap::new())
        .unwrap_err();
    assert_matches!(err, AgentError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ad_hoc_alert_reaches_subscribers_and_the_ledger() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent_with(transport.clone());
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;
    let subscriber = uuid::Uuid::new_v4();
    agent.subscribe_alerts(patient_id, subscriber).unwrap();

    let alert = AlertPayload::threshold_violation(
        patient_id,
        AlertLevel::Warning,
        "heart_rate_bpm",
        130.0,
        120.0,
    );
    agent.raise_alert(alert).await.unwrap();

    let delivered = transport.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, subscriber);
    drop(delivered);

    let block = sealed(&agent);
    assert!(block
        .records
        .iter()
        .any(|r| matches!(r, LedgerRecord::Alert { .. })));
}

#[tokio::test]
async fn unsubscribed_identity_hears_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent_with(transport.clone());
    let patient_id = agent.register_patient(john_doe()).unwrap().patient_id;
    let subscriber = uuid::Uuid::new_v4();

    agent.subscribe_alerts(patient_id, subscriber).unwrap();
    agent.unsubscribe_alerts(&patient_id, &subscriber);

    agent
        .raise_alert(AlertPayload::monitoring_lost(patient_id, 3))
        .await
        .unwrap();
    assert!(transport.delivered.lock().unwrap().is_empty());
}

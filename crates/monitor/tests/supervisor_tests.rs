//! End-to-end monitoring lifecycle tests: start/stop idempotency,
//! failure escalation, and the ledger trail a healthy task leaves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;

use vigil_core::alert::{AlertLevel, AlertPayload};
use vigil_core::config::MonitorConfig;
use vigil_core::error::CoreError;
use vigil_core::patient::Patient;
use vigil_core::registry::PatientRegistry;
use vigil_core::risk::{EvaluatorError, RiskAssessment, RiskEvaluator};
use vigil_core::telemetry::{Observation, SourceError, TelemetryReading, TelemetrySource};
use vigil_core::types::{PatientId, SubscriberId};
use vigil_ledger::{Ledger, LedgerRecord, SealOutcome};
use vigil_monitor::router::{AlertRouter, DeliveryError, NotificationTransport};
use vigil_monitor::supervisor::{MonitoringSupervisor, StartOutcome, TaskState};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct SteadySource;

#[async_trait::async_trait]
impl TelemetrySource for SteadySource {
    fn device_id(&self) -> &str {
        "watch-1"
    }

    async fn poll(&self) -> Result<TelemetryReading, SourceError> {
        let mut reading = TelemetryReading::empty("watch-1");
        reading.heart_rate_bpm = Some(72);
        reading.oxygen_saturation_pct = Some(98);
        Ok(reading)
    }

    fn validate(&self, reading: &TelemetryReading) -> bool {
        reading.has_measurements()
    }
}

struct DeadSource;

#[async_trait::async_trait]
impl TelemetrySource for DeadSource {
    fn device_id(&self) -> &str {
        "dead-1"
    }

    async fn poll(&self) -> Result<TelemetryReading, SourceError> {
        Err(SourceError::Unreachable("no signal".to_string()))
    }

    fn validate(&self, _reading: &TelemetryReading) -> bool {
        true
    }
}

struct CalmEvaluator;

#[async_trait::async_trait]
impl RiskEvaluator for CalmEvaluator {
    async fn evaluate(
        &self,
        _patient: &Patient,
        _current: Option<&Observation>,
    ) -> Result<RiskAssessment, EvaluatorError> {
        Ok(RiskAssessment::baseline())
    }
}

/// Captures every delivered alert for later inspection.
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

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn patient(id: PatientId) -> Patient {
    Patient {
        id,
        name: "John Doe".to_string(),
        dob: NaiveDate::from_ymd_opt(1980, 5, 15).unwrap(),
        gender: "M".to_string(),
        blood_type: "A+".to_string(),
        allergies: vec![],
        conditions: vec![],
        medications: vec![],
        genetic_markers: None,
        biometric_history: vec![],
    }
}

struct Harness {
    registry: Arc<PatientRegistry>,
    router: Arc<AlertRouter>,
    transport: Arc<RecordingTransport>,
    ledger: Arc<Ledger>,
    supervisor: MonitoringSupervisor,
}

fn harness() -> Harness {
    let registry = Arc::new(PatientRegistry::new());
    let transport = Arc::new(RecordingTransport::default());
    let router = Arc::new(AlertRouter::new(transport.clone()));
    let ledger = Arc::new(Ledger::new());
    let config = MonitorConfig {
        cycle_period: Duration::from_secs(1),
        call_timeout: Duration::from_millis(500),
        ..MonitorConfig::default()
    };
    let supervisor = MonitoringSupervisor::new(
        Arc::clone(&registry),
        Arc::new(CalmEvaluator),
        Arc::clone(&router),
        Arc::clone(&ledger),
        config,
    );
    Harness {
        registry,
        router,
        transport,
        ledger,
        supervisor,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_requires_a_registered_patient() {
    let h = harness();
    let err = h
        .supervisor
        .start(uuid::Uuid::new_v4(), vec![Arc::new(SteadySource)])
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "patient", .. });
}

#[tokio::test(start_paused = true)]
async fn start_stop_restart_lifecycle() {
    let h = harness();
    let patient_id = uuid::Uuid::new_v4();
    h.registry.insert(patient(patient_id));

    let outcome = h
        .supervisor
        .start(patient_id, vec![Arc::new(SteadySource)])
        .unwrap();
    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(h.supervisor.state(&patient_id), Some(TaskState::Running));

    // A second start while running is idempotent.
    let outcome = h
        .supervisor
        .start(patient_id, vec![Arc::new(SteadySource)])
        .unwrap();
    assert_eq!(outcome, StartOutcome::AlreadyRunning);

    h.supervisor.stop(&patient_id).unwrap();
    h.supervisor.wait_until_stopped(&patient_id).await;
    assert_eq!(h.supervisor.state(&patient_id), Some(TaskState::Stopped));

    // A stopped task can be started again.
    let outcome = h
        .supervisor
        .start(patient_id, vec![Arc::new(SteadySource)])
        .unwrap();
    assert_eq!(outcome, StartOutcome::Started);

    h.supervisor.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn stop_without_a_task_is_a_noop_for_registered_patients() {
    let h = harness();
    let patient_id = uuid::Uuid::new_v4();
    h.registry.insert(patient(patient_id));

    assert!(h.supervisor.stop(&patient_id).is_ok());
    assert_matches!(
        h.supervisor.stop(&uuid::Uuid::new_v4()).unwrap_err(),
        CoreError::NotFound { .. }
    );
}

#[tokio::test(start_paused = true)]
async fn healthy_task_appends_observation_records() {
    let h = harness();
    let patient_id = uuid::Uuid::new_v4();
    h.registry.insert(patient(patient_id));

    h.supervisor
        .start(patient_id, vec![Arc::new(SteadySource)])
        .unwrap();

    // First cycle fires immediately, then one per second.
    tokio::time::sleep(Duration::from_millis(3500)).await;
    h.supervisor.stop(&patient_id).unwrap();
    h.supervisor.wait_until_stopped(&patient_id).await;

    assert!(h.ledger.pending_len() >= 3);
    let outcome = h.ledger.seal_block().unwrap();
    let block = match outcome {
        SealOutcome::Sealed(block) => block,
        SealOutcome::NothingToSeal => panic!("expected a sealed block"),
    };
    assert!(block
        .records
        .iter()
        .all(|r| matches!(r, LedgerRecord::MonitoringObservation { .. })));
    assert!(block.records.iter().all(|r| r.patient_id() == patient_id));
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_stop_the_task_and_raise_a_fatal_alert() {
    let h = harness();
    let patient_id = uuid::Uuid::new_v4();
    let subscriber = uuid::Uuid::new_v4();
    h.registry.insert(patient(patient_id));
    h.router.subscribe(patient_id, subscriber);

    h.supervisor
        .start(patient_id, vec![Arc::new(DeadSource)])
        .unwrap();

    h.supervisor.wait_until_stopped(&patient_id).await;
    assert_eq!(h.supervisor.state(&patient_id), Some(TaskState::Stopped));

    // The subscriber heard about the loss of coverage.
    let delivered = h.transport.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, subscriber);
    assert_eq!(delivered[0].1.level, AlertLevel::Fatal);
    drop(delivered);

    // And the audit trail records the termination.
    let outcome = h.ledger.seal_block().unwrap();
    let block = match outcome {
        SealOutcome::Sealed(block) => block,
        SealOutcome::NothingToSeal => panic!("expected a sealed block"),
    };
    assert!(block.records.iter().any(|r| matches!(
        r,
        LedgerRecord::Generic { label, .. } if label == "monitoring_terminated"
    )));
}

#[tokio::test(start_paused = true)]
async fn cycle_concurrency_never_exceeds_the_configured_bound() {
    /// Evaluator that records how many cycle bodies are inside it at
    /// once.
    struct TrackingEvaluator {
        active: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RiskEvaluator for TrackingEvaluator {
        async fn evaluate(
            &self,
            _patient: &Patient,
            _current: Option<&Observation>,
        ) -> Result<RiskAssessment, EvaluatorError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now_active, Ordering::SeqCst);
            // Keep the cycle body occupied long enough for the other
            // patients' ticks to pile up on the pool.
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(RiskAssessment::baseline())
        }
    }

    let evaluator = Arc::new(TrackingEvaluator {
        active: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });
    let registry = Arc::new(PatientRegistry::new());
    let router = Arc::new(AlertRouter::new(Arc::new(RecordingTransport::default())));
    let ledger = Arc::new(Ledger::new());
    let config = MonitorConfig {
        cycle_period: Duration::from_secs(1),
        call_timeout: Duration::from_millis(500),
        max_concurrent_cycles: 2,
        ..MonitorConfig::default()
    };
    let supervisor = MonitoringSupervisor::new(
        Arc::clone(&registry),
        evaluator.clone(),
        router,
        ledger,
        config,
    );

    // Eight patients all tick on the same period, so every cycle
    // contends for the two permits.
    for _ in 0..8 {
        let patient_id = uuid::Uuid::new_v4();
        registry.insert(patient(patient_id));
        supervisor
            .start(patient_id, vec![Arc::new(SteadySource)])
            .unwrap();
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    supervisor.stop_all().await;

    // Every patient got cycles through the pool...
    assert!(evaluator.completed.load(Ordering::SeqCst) >= 8);
    // ...but never more than the configured bound at once.
    let peak = evaluator.peak.load(Ordering::SeqCst);
    assert!(peak >= 2, "pool was never saturated; peak {peak}");
    assert!(peak <= 2, "bound exceeded; peak {peak}");
}

#[tokio::test(start_paused = true)]
async fn two_patients_are_monitored_independently() {
    let h = harness();
    let healthy = uuid::Uuid::new_v4();
    let failing = uuid::Uuid::new_v4();
    h.registry.insert(patient(healthy));
    h.registry.insert(patient(failing));

    h.supervisor
        .start(healthy, vec![Arc::new(SteadySource)])
        .unwrap();
    h.supervisor
        .start(failing, vec![Arc::new(DeadSource)])
        .unwrap();

    h.supervisor.wait_until_stopped(&failing).await;
    assert_eq!(h.supervisor.state(&failing), Some(TaskState::Stopped));
    // The failing patient's collapse never touched the healthy task.
    assert_eq!(h.supervisor.state(&healthy), Some(TaskState::Running));

    h.supervisor.stop_all().await;
}

//! `vigil-agent` -- demo run of the continuous monitoring pipeline.
//!
//! Registers a demo patient and provider, records an initial biometric
//! snapshot, runs a synchronous risk query, schedules a follow-up, and
//! then monitors the patient with two simulated wearables (one flaky)
//! until Ctrl-C. Alerts go to the log transport; the ledger is sealed
//! periodically and verified at shutdown.
//!
//! # Environment variables
//!
//! | Variable                          | Required | Default | Description                         |
//! |-----------------------------------|----------|---------|-------------------------------------|
//! | `VIGIL_CYCLE_PERIOD_MS`           | no       | `5000`  | Time between monitoring cycles      |
//! | `VIGIL_CALL_TIMEOUT_MS`           | no       | `2000`  | Per-poll / per-evaluation bound     |
//! | `VIGIL_MAX_CONSECUTIVE_FAILURES`  | no       | `3`     | Failed cycles before a task stops   |
//! | `VIGIL_MAX_CONCURRENT_CYCLES`     | no       | `32`    | Worker-pool bound across patients   |
//! | `VIGIL_SEAL_INTERVAL_MS`          | no       | `30000` | Time between periodic ledger seals  |

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_agent::facade::CareAgent;
use vigil_agent::scheduling::{AppointmentCriteria, Priority};
use vigil_agent::sim::{BaselineRiskEvaluator, FirstSlotOptimizer, SimulatedWearable};
use vigil_core::config::MonitorConfig;
use vigil_core::patient::{Biometrics, RegisterPatientRequest};
use vigil_core::telemetry::TelemetrySource;
use vigil_monitor::delivery::LogTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vigil_agent=info,vigil_monitor=info,vigil_ledger=info,vigil_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env();
    tracing::info!(
        cycle_period_ms = config.cycle_period.as_millis() as u64,
        seal_interval_ms = config.seal_interval.as_millis() as u64,
        "Starting vigil-agent"
    );

    let agent = CareAgent::new(
        Arc::new(LogTransport),
        Arc::new(BaselineRiskEvaluator),
        Arc::new(FirstSlotOptimizer),
        config,
    );

    // Demo patient.
    let outcome = agent.register_patient(RegisterPatientRequest {
        name: "John Doe".to_string(),
        dob: "1980-05-15".to_string(),
        gender: "M".to_string(),
        blood_type: "A+".to_string(),
        allergies: vec!["penicillin".to_string()],
        conditions: vec!["hypertension".to_string()],
        medications: vec!["lisinopril".to_string()],
        genetic_markers: Some(BTreeMap::from([(
            "brca1".to_string(),
            "negative".to_string(),
        )])),
    })?;
    let patient_id = outcome.patient_id;

    let provider_id = agent.register_provider(
        "Dr. Sarah Chen",
        "cardiology",
        vec!["MD".to_string(), "FACC".to_string()],
        4.8,
        BTreeMap::from([("email".to_string(), "s.chen@clinic.example".to_string())]),
    )?;
    tracing::info!(%provider_id, "Demo provider ready");

    agent.record_biometrics(
        &patient_id,
        Biometrics {
            blood_pressure: "138/88".to_string(),
            heart_rate_bpm: 78,
            temperature_celsius: 36.9,
            oxygen_saturation_pct: 97,
            respiratory_rate: 15,
            glucose_level: Some(105.0),
            bmi: Some(27.4),
            ecg_samples: None,
            stress_level: Some(0.4),
            recorded_at: chrono::Utc::now(),
        },
    )?;

    let assessment = agent.predict_risk(&patient_id).await?;
    tracing::info!(
        overall_score = assessment.overall_score,
        level = assessment.level().as_str(),
        "Baseline risk assessment"
    );

    let proposal = agent
        .schedule_appointment(AppointmentCriteria {
            patient_id,
            specialization: "cardiology".to_string(),
            priority: Priority::Medium,
            earliest: chrono::Utc::now(),
        })
        .await?;
    tracing::info!(
        provider = %proposal.provider_name,
        scheduled_for = %proposal.scheduled_for,
        "Follow-up appointment proposed"
    );

    // The on-call subscriber hears every alert through the log transport.
    let on_call = uuid::Uuid::new_v4();
    agent.subscribe_alerts(patient_id, on_call)?;

    let sources: Vec<Arc<dyn TelemetrySource>> = vec![
        Arc::new(SimulatedWearable::new("wearable-chest", 0.0)),
        Arc::new(SimulatedWearable::new("wearable-wrist", 0.2)),
    ];
    agent.start_monitoring(patient_id, sources)?;

    let cancel = CancellationToken::new();
    let sealer = agent.spawn_sealer(cancel.clone());

    tracing::info!("Monitoring; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    agent.shutdown_monitoring().await;
    cancel.cancel();
    sealer.await?;

    // Flush whatever the last interval left pending, then prove the
    // chain is intact before exiting.
    agent.seal_ledger()?;
    agent.verify_ledger()?;

    let blocks = agent.ledger_blocks()?;
    let records: usize = blocks.iter().map(|b| b.records.len()).sum();
    tracing::info!(
        blocks = blocks.len(),
        records,
        "Ledger verified; shutdown complete"
    );
    Ok(())
}

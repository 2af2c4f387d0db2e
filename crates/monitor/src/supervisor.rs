//! Per-patient monitoring task lifecycle.
//!
//! [`MonitoringSupervisor`] owns one cooperative tokio task per
//! actively-monitored patient. Tasks tick on the configured cycle
//! period, run the [`cycle`](crate::cycle) body under a shared
//! [`Semaphore`] permit (the bounded worker pool), count consecutive
//! failures, and stop themselves — loudly — once the failure threshold
//! is crossed. Stopping is always cooperative: a cancellation token is
//! observed between cycles, never mid-cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vigil_core::alert::AlertPayload;
use vigil_core::config::MonitorConfig;
use vigil_core::error::CoreError;
use vigil_core::registry::PatientRegistry;
use vigil_core::risk::RiskEvaluator;
use vigil_core::telemetry::TelemetrySource;
use vigil_core::types::PatientId;
use vigil_ledger::{Ledger, LedgerRecord};

use crate::cycle::{run_cycle, CycleDeps};
use crate::router::AlertRouter;

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Observable lifecycle state of one patient's monitoring task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    /// Cancellation observed; the task is winding down.
    Stopping,
    Stopped,
}

/// Result of a start request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A live task already exists for this patient; starting twice is
    /// idempotent, not an error.
    AlreadyRunning,
}

struct PatientTask {
    cancel: CancellationToken,
    state: watch::Receiver<TaskState>,
    join: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// MonitoringSupervisor
// ---------------------------------------------------------------------------

/// Spawns, tracks, and stops per-patient monitoring tasks.
pub struct MonitoringSupervisor {
    registry: Arc<PatientRegistry>,
    evaluator: Arc<dyn RiskEvaluator>,
    router: Arc<AlertRouter>,
    ledger: Arc<Ledger>,
    config: MonitorConfig,
    /// Bounds how many cycle bodies run simultaneously across all
    /// patients.
    cycle_permits: Arc<Semaphore>,
    tasks: Mutex<HashMap<PatientId, PatientTask>>,
}

impl MonitoringSupervisor {
    pub fn new(
        registry: Arc<PatientRegistry>,
        evaluator: Arc<dyn RiskEvaluator>,
        router: Arc<AlertRouter>,
        ledger: Arc<Ledger>,
        config: MonitorConfig,
    ) -> Self {
        let cycle_permits = Arc::new(Semaphore::new(config.max_concurrent_cycles));
        Self {
            registry,
            evaluator,
            router,
            ledger,
            config,
            cycle_permits,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start continuous monitoring for a registered patient.
    ///
    /// Idempotent: a second start while a task is live returns
    /// [`StartOutcome::AlreadyRunning`] without spawning anything.
    pub fn start(
        &self,
        patient_id: PatientId,
        sources: Vec<Arc<dyn TelemetrySource>>,
    ) -> Result<StartOutcome, CoreError> {
        if !self.registry.contains(&patient_id) {
            return Err(CoreError::NotFound {
                entity: "patient",
                id: patient_id,
            });
        }

        let mut tasks = self.tasks.lock().expect("task table lock poisoned");

        // Reap tasks that stopped on their own so a restart is possible.
        if let Some(existing) = tasks.get(&patient_id) {
            if *existing.state.borrow() != TaskState::Stopped {
                return Ok(StartOutcome::AlreadyRunning);
            }
            tasks.remove(&patient_id);
        }

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(TaskState::Running);

        let deps = CycleDeps {
            patient_id,
            sources,
            registry: Arc::clone(&self.registry),
            evaluator: Arc::clone(&self.evaluator),
            router: Arc::clone(&self.router),
            ledger: Arc::clone(&self.ledger),
            thresholds: self.config.thresholds.clone(),
            call_timeout: self.config.call_timeout,
        };

        let join = tokio::spawn(monitor_loop(
            deps,
            self.config.cycle_period,
            self.config.max_consecutive_failures,
            Arc::clone(&self.cycle_permits),
            cancel.clone(),
            state_tx,
        ));

        tasks.insert(
            patient_id,
            PatientTask {
                cancel,
                state: state_rx,
                join,
            },
        );
        tracing::info!(patient_id = %patient_id, "Started continuous monitoring");
        Ok(StartOutcome::Started)
    }

    /// Request a cooperative stop of a patient's monitoring task.
    ///
    /// Returns immediately; the task exits after its current cycle.
    /// Stopping a registered patient who is not being monitored is a
    /// no-op.
    pub fn stop(&self, patient_id: &PatientId) -> Result<(), CoreError> {
        let tasks = self.tasks.lock().expect("task table lock poisoned");
        if let Some(task) = tasks.get(patient_id) {
            task.cancel.cancel();
            tracing::info!(patient_id = %patient_id, "Requested monitoring stop");
            return Ok(());
        }
        drop(tasks);

        if self.registry.contains(patient_id) {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "patient",
                id: *patient_id,
            })
        }
    }

    /// Current task state, or `None` if this patient was never started
    /// (or has been reaped).
    pub fn state(&self, patient_id: &PatientId) -> Option<TaskState> {
        let tasks = self.tasks.lock().expect("task table lock poisoned");
        tasks.get(patient_id).map(|task| *task.state.borrow())
    }

    /// Number of tasks currently tracked (including recently stopped
    /// ones awaiting reaping).
    pub fn tracked_tasks(&self) -> usize {
        self.tasks.lock().expect("task table lock poisoned").len()
    }

    /// Wait until a patient's task reaches [`TaskState::Stopped`].
    ///
    /// Resolves immediately when no task is tracked for the patient.
    pub async fn wait_until_stopped(&self, patient_id: &PatientId) {
        let mut state = {
            let tasks = self.tasks.lock().expect("task table lock poisoned");
            match tasks.get(patient_id) {
                Some(task) => task.state.clone(),
                None => return,
            }
        };
        // An error means the sender is gone, which only happens once
        // the task has exited.
        let _ = state.wait_for(|s| *s == TaskState::Stopped).await;
    }

    /// Cancel every task and wait for each to exit. Used at shutdown.
    pub async fn stop_all(&self) {
        let drained: Vec<(PatientId, PatientTask)> = {
            let mut tasks = self.tasks.lock().expect("task table lock poisoned");
            tasks.drain().collect()
        };
        for (patient_id, task) in drained {
            task.cancel.cancel();
            if let Err(e) = task.join.await {
                tracing::error!(patient_id = %patient_id, error = %e, "Monitoring task panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Task body
// ---------------------------------------------------------------------------

async fn monitor_loop(
    deps: CycleDeps,
    cycle_period: std::time::Duration,
    max_consecutive_failures: u32,
    cycle_permits: Arc<Semaphore>,
    cancel: CancellationToken,
    state_tx: watch::Sender<TaskState>,
) {
    let mut ticker = tokio::time::interval(cycle_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = state_tx.send(TaskState::Stopping);
                break;
            }
            _ = ticker.tick() => {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = state_tx.send(TaskState::Stopping);
                        break;
                    }
                    permit = cycle_permits.acquire() => {
                        permit.expect("cycle semaphore is never closed")
                    }
                };

                let result = run_cycle(&deps).await;
                drop(permit);

                match result {
                    Ok(outcome) => {
                        consecutive_failures = 0;
                        tracing::debug!(
                            patient_id = %deps.patient_id,
                            readings = outcome.readings_collected,
                            alerts = outcome.alerts_raised,
                            risk = outcome.assessment.overall_score,
                            "Monitoring cycle completed"
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        tracing::warn!(
                            patient_id = %deps.patient_id,
                            error = %e,
                            consecutive_failures,
                            "Monitoring cycle failed"
                        );
                        if consecutive_failures >= max_consecutive_failures {
                            give_up(&deps, consecutive_failures).await;
                            break;
                        }
                    }
                }
            }
        }
    }

    let _ = state_tx.send(TaskState::Stopped);
    tracing::info!(patient_id = %deps.patient_id, "Monitoring task exited");
}

/// Terminate monitoring loudly: a fatal alert to every subscriber and
/// a termination record in the audit trail. Silent loss of coverage is
/// the one failure mode this pipeline refuses to have.
async fn give_up(deps: &CycleDeps, consecutive_failures: u32) {
    tracing::error!(
        patient_id = %deps.patient_id,
        consecutive_failures,
        "Stopping monitoring after repeated cycle failures"
    );

    let alert = AlertPayload::monitoring_lost(deps.patient_id, consecutive_failures);
    deps.router.dispatch(deps.patient_id, &[alert.clone()]).await;

    let record = LedgerRecord::Generic {
        patient_id: deps.patient_id,
        created_at: chrono::Utc::now(),
        label: "monitoring_terminated".to_string(),
        payload: serde_json::json!({
            "consecutive_failures": consecutive_failures,
            "message": alert.message,
        }),
    };
    // The ledger may itself be the reason cycles are failing; the
    // fatal alert above has already gone out either way.
    if let Err(e) = deps.ledger.add_record(record) {
        tracing::error!(
            patient_id = %deps.patient_id,
            error = %e,
            "Could not record monitoring termination in the ledger"
        );
    }
}

//! Periodic time-triggered ledger sealing.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vigil_ledger::{Ledger, SealOutcome};

/// Seal the pending buffer on a fixed interval until cancelled.
///
/// Empty intervals produce no block. A ledger error (the halt latch)
/// ends the loop — sealing a corrupt chain would only bury the
/// evidence.
pub async fn run_seal_loop(ledger: Arc<Ledger>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first interval tick fires immediately; skip it so the first
    // seal happens one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match ledger.seal_block() {
                    Ok(SealOutcome::Sealed(block)) => {
                        tracing::info!(
                            index = block.index,
                            record_count = block.records.len(),
                            "Sealed ledger block"
                        );
                    }
                    Ok(SealOutcome::NothingToSeal) => {
                        tracing::trace!("No pending records to seal");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger seal failed; stopping seal loop");
                        break;
                    }
                }
            }
        }
    }
    tracing::info!("Seal loop exited");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_ledger::LedgerRecord;

    fn record() -> LedgerRecord {
        LedgerRecord::Generic {
            patient_id: uuid::Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            label: "note".to_string(),
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pending_records_are_sealed_on_the_interval() {
        let ledger = Arc::new(Ledger::new());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_seal_loop(
            Arc::clone(&ledger),
            Duration::from_secs(30),
            cancel.clone(),
        ));

        ledger.add_record(record()).unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(ledger.chain_len(), 1);
        assert_eq!(ledger.pending_len(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_intervals_produce_no_blocks() {
        let ledger = Arc::new(Ledger::new());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_seal_loop(
            Arc::clone(&ledger),
            Duration::from_secs(30),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(ledger.chain_len(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}

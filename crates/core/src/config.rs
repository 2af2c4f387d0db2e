//! Monitoring configuration loaded from environment variables.

use std::time::Duration;

use crate::alert::VitalThresholds;

/// Runtime configuration for the monitoring pipeline.
///
/// All fields have defaults suitable for local development; production
/// deployments override via environment variables. Cycle period, the
/// consecutive-failure threshold, and the alert thresholds are policy
/// knobs, not correctness knobs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between monitoring cycles for each patient.
    pub cycle_period: Duration,
    /// Upper bound on a single source poll or evaluator invocation.
    /// Exceeding it counts as a cycle failure, never a hang.
    pub call_timeout: Duration,
    /// Consecutive failed cycles after which a task stops and raises a
    /// fatal alert.
    pub max_consecutive_failures: u32,
    /// Maximum number of cycle bodies running simultaneously across
    /// all patients (bounded worker pool).
    pub max_concurrent_cycles: usize,
    /// Time between periodic ledger seals.
    pub seal_interval: Duration,
    /// Vitals and risk-score alerting thresholds.
    pub thresholds: VitalThresholds,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `VIGIL_CYCLE_PERIOD_MS`        | `5000`  |
    /// | `VIGIL_CALL_TIMEOUT_MS`        | `2000`  |
    /// | `VIGIL_MAX_CONSECUTIVE_FAILURES` | `3`   |
    /// | `VIGIL_MAX_CONCURRENT_CYCLES`  | `32`    |
    /// | `VIGIL_SEAL_INTERVAL_MS`       | `30000` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cycle_period: env_duration_ms("VIGIL_CYCLE_PERIOD_MS", defaults.cycle_period),
            call_timeout: env_duration_ms("VIGIL_CALL_TIMEOUT_MS", defaults.call_timeout),
            max_consecutive_failures: env_parse(
                "VIGIL_MAX_CONSECUTIVE_FAILURES",
                defaults.max_consecutive_failures,
            ),
            max_concurrent_cycles: env_parse(
                "VIGIL_MAX_CONCURRENT_CYCLES",
                defaults.max_concurrent_cycles,
            ),
            seal_interval: env_duration_ms("VIGIL_SEAL_INTERVAL_MS", defaults.seal_interval),
            thresholds: VitalThresholds::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle_period: Duration::from_millis(5000),
            call_timeout: Duration::from_millis(2000),
            max_consecutive_failures: 3,
            max_concurrent_cycles: 32,
            seal_interval: Duration::from_millis(30_000),
            thresholds: VitalThresholds::default(),
        }
    }
}

fn env_duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MonitorConfig::default();
        assert_eq!(config.cycle_period, Duration::from_millis(5000));
        assert_eq!(config.call_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.max_concurrent_cycles, 32);
        assert!(config.call_timeout < config.cycle_period);
    }
}

//! Risk assessments and the external evaluator boundary.
//!
//! The scoring models themselves live outside this system; the core
//! consumes them through [`RiskEvaluator`], a pure function boundary
//! from the pipeline's perspective.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::patient::Patient;
use crate::telemetry::Observation;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// Overall-score threshold for critical risk.
pub const RISK_THRESHOLD_CRITICAL: f64 = 0.85;

/// Overall-score threshold for high risk.
pub const RISK_THRESHOLD_HIGH: f64 = 0.6;

/// Overall-score threshold for elevated risk.
pub const RISK_THRESHOLD_ELEVATED: f64 = 0.3;

/// Classification of an overall risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Elevated,
    High,
    Critical,
}

impl RiskLevel {
    /// String representation for logs and record payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Elevated => "elevated",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Classify an overall score in `0.0..=1.0`.
    pub fn from_score(score: f64) -> Self {
        if score >= RISK_THRESHOLD_CRITICAL {
            RiskLevel::Critical
        } else if score >= RISK_THRESHOLD_HIGH {
            RiskLevel::High
        } else if score >= RISK_THRESHOLD_ELEVATED {
            RiskLevel::Elevated
        } else {
            RiskLevel::Low
        }
    }
}

// ---------------------------------------------------------------------------
// RiskAssessment
// ---------------------------------------------------------------------------

/// The evaluator's verdict for one patient at one point in time.
///
/// Category maps are keyed by risk factor name (`"cardiac"`,
/// `"brca1"`, ...) with scores in `0.0..=1.0`. `BTreeMap` keeps the
/// serialized form deterministic for ledger hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Combined score in `0.0..=1.0`.
    pub overall_score: f64,
    pub medical: BTreeMap<String, f64>,
    pub genetic: BTreeMap<String, f64>,
    pub lifestyle: BTreeMap<String, f64>,
    pub assessed_at: Timestamp,
}

impl RiskAssessment {
    /// An all-clear assessment stamped now.
    pub fn baseline() -> Self {
        Self {
            overall_score: 0.0,
            medical: BTreeMap::new(),
            genetic: BTreeMap::new(),
            lifestyle: BTreeMap::new(),
            assessed_at: chrono::Utc::now(),
        }
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.overall_score)
    }
}

// ---------------------------------------------------------------------------
// EvaluatorError
// ---------------------------------------------------------------------------

/// Failure invoking the external evaluator. Recoverable: the cycle
/// that hit it is abandoned and the next one retries.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("risk evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("risk evaluator rejected input: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// RiskEvaluator
// ---------------------------------------------------------------------------

/// External scoring capability.
///
/// `current` is `Some` during a monitoring cycle and `None` for a
/// history-only synchronous query. Implementations must be
/// side-effect-free from the pipeline's perspective.
#[async_trait::async_trait]
pub trait RiskEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        patient: &Patient,
        current: Option<&Observation>,
    ) -> Result<RiskAssessment, EvaluatorError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Simulated devices, a baseline evaluator, and a naive optimizer.
//!
//! These are the implementations behind the demo binary and the
//! integration tests — plausible enough to exercise every pipeline
//! path (including failure escalation via injected fault rates)
//! without any real hardware or model behind them.

use rand::Rng;

use vigil_core::patient::{HealthcareProvider, Patient};
use vigil_core::risk::{EvaluatorError, RiskAssessment, RiskEvaluator};
use vigil_core::telemetry::{Observation, SourceError, TelemetryReading, TelemetrySource};

use crate::scheduling::{
    AppointmentCriteria, AppointmentOptimizer, AppointmentProposal, Priority, SchedulingError,
};

// ---------------------------------------------------------------------------
// SimulatedWearable
// ---------------------------------------------------------------------------

/// A wearable that fabricates plausible vitals.
///
/// `failure_rate` in `0.0..=1.0` injects poll failures to exercise the
/// degraded-cycle and escalation paths.
pub struct SimulatedWearable {
    device_id: String,
    failure_rate: f64,
}

impl SimulatedWearable {
    pub fn new(device_id: impl Into<String>, failure_rate: f64) -> Self {
        Self {
            device_id: device_id.into(),
            failure_rate,
        }
    }
}

#[async_trait::async_trait]
impl TelemetrySource for SimulatedWearable {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn poll(&self) -> Result<TelemetryReading, SourceError> {
        let mut rng = rand::rng();
        if rng.random::<f64>() < self.failure_rate {
            return Err(SourceError::Unreachable(
                "simulated radio dropout".to_string(),
            ));
        }

        let mut reading = TelemetryReading::empty(self.device_id.clone());
        reading.heart_rate_bpm = Some(rng.random_range(58..=102));
        reading.systolic_mmhg = Some(rng.random_range(104..=136));
        reading.diastolic_mmhg = Some(rng.random_range(64..=88));
        reading.temperature_celsius = Some(rng.random_range(36.1..37.6));
        reading.oxygen_saturation_pct = Some(rng.random_range(94..=100));
        reading.respiratory_rate = Some(rng.random_range(11..=19));
        Ok(reading)
    }

    fn validate(&self, reading: &TelemetryReading) -> bool {
        if !reading.has_measurements() {
            return false;
        }
        // Physiological plausibility, not clinical normality — alerting
        // decides what is worrying, validation decides what is real.
        reading.heart_rate_bpm.map_or(true, |hr| (20..=260).contains(&hr))
            && reading
                .temperature_celsius
                .map_or(true, |t| (30.0..=45.0).contains(&t))
            && reading.oxygen_saturation_pct.map_or(true, |s| s <= 100)
            && reading
                .systolic_mmhg
                .map_or(true, |s| (50..=260).contains(&s))
    }
}

// ---------------------------------------------------------------------------
// BaselineRiskEvaluator
// ---------------------------------------------------------------------------

/// History-and-profile scoring without any external model.
///
/// Categories are weighted 0.4 (medical) / 0.3 (genetic) / 0.3
/// (lifestyle); each category score is the capped sum of its factor
/// scores.
#[derive(Debug, Default)]
pub struct BaselineRiskEvaluator;

#[async_trait::async_trait]
impl RiskEvaluator for BaselineRiskEvaluator {
    async fn evaluate(
        &self,
        patient: &Patient,
        current: Option<&Observation>,
    ) -> Result<RiskAssessment, EvaluatorError> {
        let mut assessment = RiskAssessment::baseline();

        for condition in &patient.conditions {
            let weight = match condition.to_ascii_lowercase().as_str() {
                "hypertension" => 0.15,
                "diabetes" => 0.2,
                _ => 0.1,
            };
            assessment.medical.insert(condition.clone(), weight);
        }

        if let Some(markers) = &patient.genetic_markers {
            for marker in markers.keys() {
                assessment.genetic.insert(marker.clone(), 0.1);
            }
        }

        if let Some(latest) = patient.biometric_history.last() {
            if let Some(stress) = latest.stress_level {
                assessment
                    .lifestyle
                    .insert("stress".to_string(), stress.clamp(0.0, 1.0) * 0.3);
            }
            if let Some(bmi) = latest.bmi {
                if bmi >= 30.0 {
                    assessment.lifestyle.insert("bmi".to_string(), 0.15);
                }
            }
        }

        // Live vitals sharpen the picture when a cycle supplies them.
        if let Some(observation) = current {
            for reading in &observation.readings {
                if reading.oxygen_saturation_pct.is_some_and(|s| s < 92) {
                    assessment.medical.insert("hypoxia".to_string(), 0.3);
                }
                if reading.heart_rate_bpm.is_some_and(|hr| hr > 120) {
                    assessment.medical.insert("tachycardia".to_string(), 0.2);
                }
            }
        }

        let medical: f64 = assessment.medical.values().sum::<f64>().min(1.0);
        let genetic: f64 = assessment.genetic.values().sum::<f64>().min(1.0);
        let lifestyle: f64 = assessment.lifestyle.values().sum::<f64>().min(1.0);
        assessment.overall_score = (medical * 0.4 + genetic * 0.3 + lifestyle * 0.3).clamp(0.0, 1.0);

        Ok(assessment)
    }
}

// ---------------------------------------------------------------------------
// FirstSlotOptimizer
// ---------------------------------------------------------------------------

/// Picks the highest-rated matching provider and offsets the slot by
/// priority lead time.
#[derive(Debug, Default)]
pub struct FirstSlotOptimizer;

impl FirstSlotOptimizer {
    fn lead_time(priority: Priority) -> chrono::Duration {
        match priority {
            Priority::Critical => chrono::Duration::zero(),
            Priority::High => chrono::Duration::hours(4),
            Priority::Medium => chrono::Duration::hours(24),
            Priority::Low => chrono::Duration::hours(72),
        }
    }
}

#[async_trait::async_trait]
impl AppointmentOptimizer for FirstSlotOptimizer {
    async fn schedule(
        &self,
        criteria: &AppointmentCriteria,
        providers: &[HealthcareProvider],
    ) -> Result<AppointmentProposal, SchedulingError> {
        let provider = providers
            .iter()
            .filter(|p| p.specialization.eq_ignore_ascii_case(&criteria.specialization))
            .max_by(|a, b| a.rating.total_cmp(&b.rating))
            .ok_or_else(|| SchedulingError::NoMatchingProvider(criteria.specialization.clone()))?;

        Ok(AppointmentProposal {
            patient_id: criteria.patient_id,
            provider_id: provider.id,
            provider_name: provider.name.clone(),
            scheduled_for: criteria.earliest + Self::lead_time(criteria.priority),
            priority: criteria.priority,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn patient() -> Patient {
        Patient {
            id: uuid::Uuid::new_v4(),
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

    fn provider(specialization: &str, rating: f64) -> HealthcareProvider {
        HealthcareProvider {
            id: uuid::Uuid::new_v4(),
            name: format!("Dr. {specialization}"),
            specialization: specialization.to_string(),
            credentials: vec!["MD".to_string()],
            rating,
            contact_info: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn wearable_without_faults_produces_valid_readings() {
        let wearable = SimulatedWearable::new("watch-1", 0.0);
        for _ in 0..20 {
            let reading = wearable.poll().await.unwrap();
            assert!(wearable.validate(&reading));
            assert!(reading.has_measurements());
        }
    }

    #[tokio::test]
    async fn wearable_with_certain_failure_always_fails() {
        let wearable = SimulatedWearable::new("watch-1", 1.0);
        assert!(wearable.poll().await.is_err());
    }

    #[tokio::test]
    async fn healthy_profile_scores_low() {
        let assessment = BaselineRiskEvaluator
            .evaluate(&patient(), None)
            .await
            .unwrap();
        assert_eq!(assessment.overall_score, 0.0);
    }

    #[tokio::test]
    async fn conditions_and_markers_raise_the_score() {
        let mut p = patient();
        p.conditions = vec!["hypertension".to_string(), "diabetes".to_string()];
        p.genetic_markers = Some(BTreeMap::from([(
            "brca1".to_string(),
            "variant".to_string(),
        )]));

        let assessment = BaselineRiskEvaluator.evaluate(&p, None).await.unwrap();
        assert!(assessment.overall_score > 0.1);
        assert_eq!(assessment.medical.len(), 2);
        assert_eq!(assessment.genetic.len(), 1);
    }

    #[tokio::test]
    async fn low_spo2_in_current_observation_adds_hypoxia() {
        let p = patient();
        let mut reading = vigil_core::telemetry::TelemetryReading::empty("watch-1");
        reading.oxygen_saturation_pct = Some(85);
        let observation = Observation::new(p.id, vec![reading]);

        let assessment = BaselineRiskEvaluator
            .evaluate(&p, Some(&observation))
            .await
            .unwrap();
        assert!(assessment.medical.contains_key("hypoxia"));
        assert!(assessment.overall_score > 0.0);
    }

    #[tokio::test]
    async fn optimizer_prefers_the_highest_rated_match() {
        let providers = vec![
            provider("cardiology", 4.1),
            provider("cardiology", 4.8),
            provider("dermatology", 5.0),
        ];
        let criteria = AppointmentCriteria {
            patient_id: uuid::Uuid::new_v4(),
            specialization: "Cardiology".to_string(),
            priority: Priority::High,
            earliest: chrono::Utc::now(),
        };

        let proposal = FirstSlotOptimizer
            .schedule(&criteria, &providers)
            .await
            .unwrap();
        assert_eq!(proposal.provider_id, providers[1].id);
        assert_eq!(
            proposal.scheduled_for,
            criteria.earliest + chrono::Duration::hours(4)
        );
    }

    #[tokio::test]
    async fn optimizer_with_no_match_reports_the_specialization() {
        let criteria = AppointmentCriteria {
            patient_id: uuid::Uuid::new_v4(),
            specialization: "neurology".to_string(),
            priority: Priority::Low,
            earliest: chrono::Utc::now(),
        };

        let err = FirstSlotOptimizer.schedule(&criteria, &[]).await.unwrap_err();
        assert!(matches!(err, SchedulingError::NoMatchingProvider(s) if s == "neurology"));
    }
}

//! Accuracy drift detection over recently settled predictions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use courtside_db::PredictionRepository;
use courtside_models::{DriftAssessment, PredictionRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    pub window_days: i64,
    pub min_sample_size: usize,
    pub threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_sample_size: 50,
            threshold: 0.05,
        }
    }
}

/// One-sided check: only a drop below the baseline counts.
/// Below `min_sample_size` completed records the verdict is always "no drift".
pub fn evaluate_drift(
    records: &[PredictionRecord],
    min_sample_size: usize,
    baseline_accuracy: f64,
    threshold: f64,
) -> DriftAssessment {
    let completed: Vec<&PredictionRecord> = records.iter().filter(|r| r.is_completed()).collect();
    let total = completed.len();

    if total == 0 || total < min_sample_size {
        return DriftAssessment {
            should_retrain: false,
            recent_accuracy: 0.0,
            baseline_accuracy,
            sample_size: total,
        };
    }

    let correct = completed.iter().filter(|r| r.is_correct == Some(true)).count();
    let recent_accuracy = correct as f64 / total as f64;

    DriftAssessment {
        should_retrain: baseline_accuracy - recent_accuracy > threshold,
        recent_accuracy,
        baseline_accuracy,
        sample_size: total,
    }
}

pub struct DriftMonitor {
    predictions: Arc<dyn PredictionRepository>,
}

impl DriftMonitor {
    pub fn new(predictions: Arc<dyn PredictionRepository>) -> Self {
        Self { predictions }
    }

    pub async fn assess_drift(
        &self,
        window_days: i64,
        min_sample_size: usize,
        baseline_accuracy: f64,
        threshold: f64,
    ) -> Result<DriftAssessment> {
        self.assess_drift_at(Utc::now(), window_days, min_sample_size, baseline_accuracy, threshold)
            .await
    }

    pub async fn assess_drift_at(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
        min_sample_size: usize,
        baseline_accuracy: f64,
        threshold: f64,
    ) -> Result<DriftAssessment> {
        let since = now - Duration::days(window_days);
        let recent = self.predictions.completed_since(since).await?;
        let assessment = evaluate_drift(&recent, min_sample_size, baseline_accuracy, threshold);

        info!(
            window_days,
            sample_size = assessment.sample_size,
            recent_accuracy = assessment.recent_accuracy,
            baseline_accuracy,
            should_retrain = assessment.should_retrain,
            "Drift assessed"
        );
        Ok(assessment)
    }
}

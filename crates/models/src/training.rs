use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One labeled row of the append-only training dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingSample {
    pub game_id: Uuid,
    pub game_date: NaiveDate,
    pub schema_version: String,
    pub features: Vec<f64>,
    pub home_won: bool,
    pub collected_at: DateTime<Utc>,
}

/// Ledger status of the version currently serving.
pub const VERSION_ACTIVE: &str = "active";
/// Ledger status of a version replaced by a newer publish.
pub const VERSION_RETIRED: &str = "retired";

/// Ledger entry written for every published model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelVersionRecord {
    pub version: String,
    pub schema_version: String,
    pub accuracy: f64,
    pub roc_auc: f64,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub test_samples: usize,
    pub status: String,
    pub deployed_at: DateTime<Utc>,
}

/// Verdict of one drift check. Only the verdict and the two accuracies matter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftAssessment {
    pub should_retrain: bool,
    pub recent_accuracy: f64,
    pub baseline_accuracy: f64,
    pub sample_size: usize,
}

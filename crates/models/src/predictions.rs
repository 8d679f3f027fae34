use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CourtsideError, Result};

/// Tolerance for `home + away == 1.0`.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

pub const HIGH_CONFIDENCE: f64 = 0.7;
pub const MEDIUM_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    pub fn from_scores(home_score: i32, away_score: i32) -> Result<Self> {
        match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Ok(Side::Home),
            std::cmp::Ordering::Less => Ok(Side::Away),
            std::cmp::Ordering::Equal => Err(CourtsideError::InvalidInput(format!(
                "basketball games cannot end tied ({home_score}-{away_score})"
            ))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = CourtsideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "home" => Ok(Side::Home),
            "away" => Ok(Side::Away),
            other => Err(CourtsideError::InvalidInput(format!("unknown side: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Pending,
    Completed,
}

impl PredictionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionStatus::Pending => "pending",
            PredictionStatus::Completed => "completed",
        }
    }
}

impl FromStr for PredictionStatus {
    type Err = CourtsideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PredictionStatus::Pending),
            "completed" => Ok(PredictionStatus::Completed),
            other => Err(CourtsideError::InvalidInput(format!(
                "unknown prediction status: {other}"
            ))),
        }
    }
}

/// Output of the model registry for one feature vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPrediction {
    pub predicted_winner: Side,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub confidence: f64,
    pub model_version: String,
}

impl ModelPrediction {
    /// Builds the two-sided distribution from the home-win probability.
    /// Ties at 0.5 go to the home side.
    pub fn from_home_probability(home_win_probability: f64, model_version: impl Into<String>) -> Result<Self> {
        if !home_win_probability.is_finite() {
            return Err(CourtsideError::InvalidProbability {
                prob: home_win_probability,
            });
        }
        let home = home_win_probability.clamp(0.0, 1.0);
        let away = 1.0 - home;
        let predicted_winner = if home >= 0.5 { Side::Home } else { Side::Away };

        Ok(Self {
            predicted_winner,
            home_win_probability: home,
            away_win_probability: away,
            confidence: home.max(away),
            model_version: model_version.into(),
        })
    }

    pub fn probability_of(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home_win_probability,
            Side::Away => self.away_win_probability,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRequest {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub user_id: String,
}

impl PredictionRequest {
    pub fn validate(&self) -> Result<()> {
        if self.home_team_id <= 0 || self.away_team_id <= 0 {
            return Err(CourtsideError::InvalidInput(
                "team ids must be positive".to_string(),
            ));
        }
        if self.home_team_id == self.away_team_id {
            return Err(CourtsideError::InvalidInput(
                "a team cannot play itself".to_string(),
            ));
        }
        if self.user_id.trim().is_empty() {
            return Err(CourtsideError::InvalidInput("user_id is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub predicted_winner: Side,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub confidence: f64,
    pub model_version: String,
    pub status: PredictionStatus,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn pending(request: &PredictionRequest, prediction: ModelPrediction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            home_team_id: request.home_team_id,
            away_team_id: request.away_team_id,
            game_date: request.game_date,
            predicted_winner: prediction.predicted_winner,
            home_win_probability: prediction.home_win_probability,
            away_win_probability: prediction.away_win_probability,
            confidence: prediction.confidence,
            model_version: prediction.model_version,
            status: PredictionStatus::Pending,
            is_correct: None,
            created_at: Utc::now(),
        }
    }

    /// Completes the record with the realized winner. A record settles once.
    pub fn settle(&mut self, winner: Side) -> Result<()> {
        if self.status == PredictionStatus::Completed {
            return Err(CourtsideError::InvalidInput(format!(
                "prediction {} is already settled",
                self.id
            )));
        }
        self.status = PredictionStatus::Completed;
        self.is_correct = Some(self.predicted_winner == winner);
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == PredictionStatus::Completed
    }

    pub fn bucket(&self) -> ConfidenceBucket {
        ConfidenceBucket::from_confidence(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    /// Every value lands in exactly one bucket; NaN counts as low.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceBucket::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BucketAccuracy {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl BucketAccuracy {
    fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
        self.accuracy = self.correct as f64 / self.total as f64;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccuracyByConfidence {
    pub high: BucketAccuracy,
    pub medium: BucketAccuracy,
    pub low: BucketAccuracy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccuracySummary {
    pub user_id: String,
    pub total_predictions: usize,
    pub correct_predictions: usize,
    pub accuracy: f64,
    pub by_confidence: AccuracyByConfidence,
}

impl AccuracySummary {
    /// Accuracy over completed records only. Empty buckets report 0, not NaN.
    pub fn from_records(user_id: impl Into<String>, records: &[PredictionRecord]) -> Self {
        let mut overall = BucketAccuracy::default();
        let mut by_confidence = AccuracyByConfidence::default();

        for record in records.iter().filter(|r| r.is_completed()) {
            let is_correct = record.is_correct.unwrap_or(false);
            overall.record(is_correct);
            match record.bucket() {
                ConfidenceBucket::High => by_confidence.high.record(is_correct),
                ConfidenceBucket::Medium => by_confidence.medium.record(is_correct),
                ConfidenceBucket::Low => by_confidence.low.record(is_correct),
            }
        }

        Self {
            user_id: user_id.into(),
            total_predictions: overall.total,
            correct_predictions: overall.correct,
            accuracy: overall.accuracy,
            by_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request() -> PredictionRequest {
        PredictionRequest {
            home_team_id: 1,
            away_team_id: 2,
            game_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            user_id: "user-1".to_string(),
        }
    }

    fn completed(confidence: f64, is_correct: bool) -> PredictionRecord {
        let prediction = ModelPrediction::from_home_probability(confidence, "v1").unwrap();
        let mut record = PredictionRecord::pending(&request(), prediction);
        let winner = if is_correct { Side::Home } else { Side::Away };
        record.settle(winner).unwrap();
        record
    }

    #[test]
    fn test_prediction_from_home_probability() {
        let prediction = ModelPrediction::from_home_probability(0.62, "v1").unwrap();

        assert_eq!(prediction.predicted_winner, Side::Home);
        assert_eq!(prediction.home_win_probability, 0.62);
        assert!((prediction.away_win_probability - 0.38).abs() < PROBABILITY_TOLERANCE);
        assert_eq!(prediction.confidence, 0.62);
    }

    #[test]
    fn test_prediction_away_favourite() {
        let prediction = ModelPrediction::from_home_probability(0.3, "v1").unwrap();
        assert_eq!(prediction.predicted_winner, Side::Away);
        assert!((prediction.confidence - 0.7).abs() < PROBABILITY_TOLERANCE);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let result = ModelPrediction::from_home_probability(f64::NAN, "v1");
        assert!(matches!(result, Err(CourtsideError::InvalidProbability { .. })));
    }

    #[test]
    fn test_settle_only_once() {
        let prediction = ModelPrediction::from_home_probability(0.55, "v1").unwrap();
        let mut record = PredictionRecord::pending(&request(), prediction);

        record.settle(Side::Away).unwrap();
        assert_eq!(record.status, PredictionStatus::Completed);
        assert_eq!(record.is_correct, Some(false));
        assert!(record.settle(Side::Home).is_err());
        assert_eq!(record.is_correct, Some(false));
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let mut same_team = request();
        same_team.away_team_id = 1;
        assert!(same_team.validate().is_err());

        let mut anonymous = request();
        anonymous.user_id = "  ".to_string();
        assert!(anonymous.validate().is_err());
    }

    #[test]
    fn test_side_from_scores() {
        assert_eq!(Side::from_scores(110, 101).unwrap(), Side::Home);
        assert_eq!(Side::from_scores(99, 101).unwrap(), Side::Away);
        assert!(Side::from_scores(100, 100).is_err());
    }

    #[test]
    fn test_accuracy_summary_buckets() {
        let records = vec![
            completed(0.75, true),
            completed(0.71, false),
            completed(0.65, true),
            completed(0.55, true),
        ];

        let summary = AccuracySummary::from_records("user-1", &records);

        assert_eq!(summary.total_predictions, 4);
        assert_eq!(summary.correct_predictions, 3);
        assert!((summary.accuracy - 0.75).abs() < 1e-9);
        assert_eq!(summary.by_confidence.high.total, 2);
        assert_eq!(summary.by_confidence.high.correct, 1);
        assert_eq!(summary.by_confidence.medium.total, 1);
        assert_eq!(summary.by_confidence.low.total, 1);
    }

    #[test]
    fn test_accuracy_ignores_pending_and_reports_zero_when_empty() {
        let prediction = ModelPrediction::from_home_probability(0.8, "v1").unwrap();
        let pending = PredictionRecord::pending(&request(), prediction);

        let summary = AccuracySummary::from_records("user-1", &[pending]);

        assert_eq!(summary.total_predictions, 0);
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.by_confidence.medium.accuracy, 0.0);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(ConfidenceBucket::from_confidence(0.7), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_confidence(1.0), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_confidence(0.6), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_confidence(0.6999), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_confidence(0.5999), ConfidenceBucket::Low);
        assert_eq!(ConfidenceBucket::from_confidence(f64::NAN), ConfidenceBucket::Low);
    }

    proptest! {
        #[test]
        fn prop_probabilities_sum_to_one(p in -0.5f64..1.5) {
            let prediction = ModelPrediction::from_home_probability(p, "v1").unwrap();
            let total = prediction.home_win_probability + prediction.away_win_probability;
            prop_assert!((total - 1.0).abs() < PROBABILITY_TOLERANCE);
            prop_assert_eq!(
                prediction.confidence,
                prediction.home_win_probability.max(prediction.away_win_probability)
            );
        }

        #[test]
        fn prop_buckets_partition(confidences in proptest::collection::vec(0.0f64..=1.0, 0..50)) {
            let records: Vec<_> = confidences.iter().map(|c| completed(*c, true)).collect();
            let summary = AccuracySummary::from_records("u", &records);
            let b = &summary.by_confidence;
            prop_assert_eq!(b.high.total + b.medium.total + b.low.total, summary.total_predictions);
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use courtside_models::{
    CourtsideError, GameRecord, ModelVersionRecord, PredictionRecord, Result, TrainingSample,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PredictionRow {
    pub id: Uuid,
    pub user_id: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub predicted_winner: String,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub confidence: f64,
    pub model_version: String,
    pub status: String,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PredictionRow> for PredictionRecord {
    type Error = CourtsideError;

    fn try_from(row: PredictionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            game_date: row.game_date,
            predicted_winner: row.predicted_winner.parse()?,
            home_win_probability: row.home_win_probability,
            away_win_probability: row.away_win_probability,
            confidence: row.confidence,
            model_version: row.model_version,
            status: row.status.parse()?,
            is_correct: row.is_correct,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameRow {
    pub id: Uuid,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub season: String,
    pub status: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = CourtsideError;

    fn try_from(row: GameRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            game_date: row.game_date,
            season: row.season,
            status: row.status.parse()?,
            home_score: row.home_score,
            away_score: row.away_score,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModelVersionRow {
    pub version: String,
    pub schema_version: String,
    pub accuracy: f64,
    pub roc_auc: f64,
    pub trained_at: DateTime<Utc>,
    pub training_samples: i64,
    pub test_samples: i64,
    pub status: String,
    pub deployed_at: DateTime<Utc>,
}

impl From<ModelVersionRow> for ModelVersionRecord {
    fn from(row: ModelVersionRow) -> Self {
        Self {
            version: row.version,
            schema_version: row.schema_version,
            accuracy: row.accuracy,
            roc_auc: row.roc_auc,
            trained_at: row.trained_at,
            training_samples: usize::try_from(row.training_samples).unwrap_or_default(),
            test_samples: usize::try_from(row.test_samples).unwrap_or_default(),
            status: row.status,
            deployed_at: row.deployed_at,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainingSampleRow {
    pub game_id: Uuid,
    pub game_date: NaiveDate,
    pub schema_version: String,
    pub features: Vec<f64>,
    pub home_won: bool,
    pub collected_at: DateTime<Utc>,
}

impl From<TrainingSampleRow> for TrainingSample {
    fn from(row: TrainingSampleRow) -> Self {
        Self {
            game_id: row.game_id,
            game_date: row.game_date,
            schema_version: row.schema_version,
            features: row.features,
            home_won: row.home_won,
            collected_at: row.collected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::{PredictionStatus, Side};

    #[test]
    fn test_prediction_row_conversion() {
        let row = PredictionRow {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            home_team_id: 1,
            away_team_id: 2,
            game_date: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            predicted_winner: "away".into(),
            home_win_probability: 0.4,
            away_win_probability: 0.6,
            confidence: 0.6,
            model_version: "v1".into(),
            status: "completed".into(),
            is_correct: Some(true),
            created_at: Utc::now(),
        };

        let record = PredictionRecord::try_from(row).unwrap();
        assert_eq!(record.predicted_winner, Side::Away);
        assert_eq!(record.status, PredictionStatus::Completed);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let row = GameRow {
            id: Uuid::new_v4(),
            home_team_id: 1,
            away_team_id: 2,
            game_date: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            season: "2024-2025".into(),
            status: "suspended".into(),
            home_score: None,
            away_score: None,
            updated_at: Utc::now(),
        };
        assert!(GameRecord::try_from(row).is_err());
    }
}

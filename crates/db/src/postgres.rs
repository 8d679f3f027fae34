use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use courtside_models::{
    GameRecord, GameStatus, ModelVersionRecord, PredictionRecord, PredictionStatus, Result, Side,
    TrainingSample, VERSION_ACTIVE, VERSION_RETIRED,
};
use sqlx::PgPool;
use tracing::debug;

use crate::repository::*;
use crate::schema::*;

const PREDICTION_COLUMNS: &str = "id, user_id, home_team_id, away_team_id, game_date, \
    predicted_winner, home_win_probability, away_win_probability, confidence, \
    model_version, status, is_correct, created_at";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_predictions(rows: Vec<PredictionRow>) -> Result<Vec<PredictionRecord>> {
        rows.into_iter().map(PredictionRecord::try_from).collect()
    }
}

#[async_trait]
impl PredictionRepository for PgRepository {
    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO predictions (id, user_id, home_team_id, away_team_id, game_date, \
             predicted_winner, home_win_probability, away_win_probability, confidence, \
             model_version, status, is_correct, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(prediction.id)
        .bind(&prediction.user_id)
        .bind(prediction.home_team_id)
        .bind(prediction.away_team_id)
        .bind(prediction.game_date)
        .bind(prediction.predicted_winner.as_str())
        .bind(prediction.home_win_probability)
        .bind(prediction.away_win_probability)
        .bind(prediction.confidence)
        .bind(&prediction.model_version)
        .bind(prediction.status.as_str())
        .bind(prediction.is_correct)
        .bind(prediction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Self::into_predictions(rows)
    }

    async fn completed_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 AND status = $2"
        ))
        .bind(user_id)
        .bind(PredictionStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;
        Self::into_predictions(rows)
    }

    async fn completed_since(&self, since: DateTime<Utc>) -> Result<Vec<PredictionRecord>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE status = $1 AND created_at >= $2"
        ))
        .bind(PredictionStatus::Completed.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Self::into_predictions(rows)
    }

    async fn settle_predictions(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        game_date: NaiveDate,
        winner: Side,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE predictions SET status = $1, is_correct = (predicted_winner = $2) \
             WHERE home_team_id = $3 AND away_team_id = $4 AND game_date = $5 AND status = $6",
        )
        .bind(PredictionStatus::Completed.as_str())
        .bind(winner.as_str())
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(game_date)
        .bind(PredictionStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        debug!(home_team_id, away_team_id, %game_date, settled = result.rows_affected(), "Settled predictions");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GameRepository for PgRepository {
    async fn upsert_game(&self, game: &GameRecord) -> Result<GameRecord> {
        let row: GameRow = sqlx::query_as(
            "INSERT INTO games (id, home_team_id, away_team_id, game_date, season, status, \
             home_score, away_score, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (home_team_id, away_team_id, game_date) DO UPDATE SET \
             status = EXCLUDED.status, home_score = EXCLUDED.home_score, \
             away_score = EXCLUDED.away_score, updated_at = EXCLUDED.updated_at \
             RETURNING id, home_team_id, away_team_id, game_date, season, status, \
             home_score, away_score, updated_at",
        )
        .bind(game.id)
        .bind(game.home_team_id)
        .bind(game.away_team_id)
        .bind(game.game_date)
        .bind(&game.season)
        .bind(game.status.as_str())
        .bind(game.home_score)
        .bind(game.away_score)
        .bind(game.updated_at)
        .fetch_one(&self.pool)
        .await?;
        GameRecord::try_from(row)
    }

    async fn completed_games_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<GameRecord>> {
        let rows: Vec<GameRow> = sqlx::query_as(
            "SELECT id, home_team_id, away_team_id, game_date, season, status, home_score, \
             away_score, updated_at FROM games \
             WHERE status = $1 AND game_date >= $2 AND game_date <= $3 ORDER BY game_date",
        )
        .bind(GameStatus::Completed.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(GameRecord::try_from).collect()
    }
}

#[async_trait]
impl ModelVersionRepository for PgRepository {
    async fn record_version(&self, version: &ModelVersionRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if version.status == VERSION_ACTIVE {
            let retired = sqlx::query("UPDATE model_versions SET status = $1 WHERE status = $2")
                .bind(VERSION_RETIRED)
                .bind(VERSION_ACTIVE)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(retired, version = %version.version, "Retired previous model versions");
        }
        sqlx::query(
            "INSERT INTO model_versions (version, schema_version, accuracy, roc_auc, trained_at, \
             training_samples, test_samples, status, deployed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&version.version)
        .bind(&version.schema_version)
        .bind(version.accuracy)
        .bind(version.roc_auc)
        .bind(version.trained_at)
        .bind(i64::try_from(version.training_samples).unwrap_or(i64::MAX))
        .bind(i64::try_from(version.test_samples).unwrap_or(i64::MAX))
        .bind(&version.status)
        .bind(version.deployed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_versions(&self) -> Result<Vec<ModelVersionRecord>> {
        let rows: Vec<ModelVersionRow> = sqlx::query_as(
            "SELECT version, schema_version, accuracy, roc_auc, trained_at, training_samples, \
             test_samples, status, deployed_at FROM model_versions ORDER BY trained_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ModelVersionRecord::from).collect())
    }

    async fn active_version(&self) -> Result<Option<ModelVersionRecord>> {
        let row: Option<ModelVersionRow> = sqlx::query_as(
            "SELECT version, schema_version, accuracy, roc_auc, trained_at, training_samples, \
             test_samples, status, deployed_at FROM model_versions WHERE status = $1 \
             ORDER BY trained_at DESC LIMIT 1",
        )
        .bind(VERSION_ACTIVE)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ModelVersionRecord::from))
    }
}

#[async_trait]
impl TrainingDataRepository for PgRepository {
    async fn append_samples(&self, samples: &[TrainingSample]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for sample in samples {
            let result = sqlx::query(
                "INSERT INTO training_samples (game_id, game_date, schema_version, features, \
                 home_won, collected_at) VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (game_id) DO NOTHING",
            )
            .bind(sample.game_id)
            .bind(sample.game_date)
            .bind(&sample.schema_version)
            .bind(&sample.features)
            .bind(sample.home_won)
            .bind(sample.collected_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn load_samples(&self, schema_version: &str) -> Result<Vec<TrainingSample>> {
        let rows: Vec<TrainingSampleRow> = sqlx::query_as(
            "SELECT game_id, game_date, schema_version, features, home_won, collected_at \
             FROM training_samples WHERE schema_version = $1 ORDER BY game_date, collected_at",
        )
        .bind(schema_version)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TrainingSample::from).collect())
    }
}

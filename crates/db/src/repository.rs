use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use courtside_models::{
    GameRecord, ModelVersionRecord, PredictionRecord, Result, Side, TrainingSample,
};

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()>;

    /// Newest first, at most `limit` rows.
    async fn history_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>>;

    async fn completed_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>>;

    /// Completed predictions created at or after `since`, across all users.
    async fn completed_since(&self, since: DateTime<Utc>) -> Result<Vec<PredictionRecord>>;

    /// Completes every pending prediction for the matchup. Already completed
    /// rows are left alone. Returns the number of rows settled.
    async fn settle_predictions(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        game_date: NaiveDate,
        winner: Side,
    ) -> Result<u64>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Inserts the game, or updates status and scores of the stored one.
    /// Returns the stored record, whose id is stable across upserts.
    async fn upsert_game(&self, game: &GameRecord) -> Result<GameRecord>;

    async fn completed_games_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<GameRecord>>;
}

#[async_trait]
pub trait ModelVersionRepository: Send + Sync {
    /// Appends a ledger row. Recording an `active` row retires every
    /// previously active one in the same write.
    async fn record_version(&self, version: &ModelVersionRecord) -> Result<()>;

    /// Newest first.
    async fn list_versions(&self) -> Result<Vec<ModelVersionRecord>>;

    /// Newest row whose status is `active`.
    async fn active_version(&self) -> Result<Option<ModelVersionRecord>>;
}

#[async_trait]
pub trait TrainingDataRepository: Send + Sync {
    /// Appends samples; a game already in the dataset is skipped, never
    /// rewritten. Returns the number of rows added.
    async fn append_samples(&self, samples: &[TrainingSample]) -> Result<u64>;

    async fn load_samples(&self, schema_version: &str) -> Result<Vec<TrainingSample>>;
}

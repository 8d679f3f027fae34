use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use courtside_models::{
    GameRecord, GameStatus, ModelVersionRecord, PredictionRecord, PredictionStatus, Result, Side,
    TrainingSample, VERSION_ACTIVE, VERSION_RETIRED,
};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::repository::*;

type MatchupKey = (i64, i64, NaiveDate);

/// Repository kept entirely in process memory. Backs tests and local runs
/// without Postgres.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    predictions: RwLock<Vec<PredictionRecord>>,
    games: DashMap<MatchupKey, GameRecord>,
    versions: RwLock<Vec<ModelVersionRecord>>,
    samples: RwLock<Vec<TrainingSample>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.read().len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.read().len()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryRepository {
    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()> {
        self.predictions.write().push(prediction.clone());
        Ok(())
    }

    async fn history_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>> {
        let mut history: Vec<PredictionRecord> = self
            .predictions
            .read()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history.truncate(limit);
        Ok(history)
    }

    async fn completed_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>> {
        Ok(self
            .predictions
            .read()
            .iter()
            .filter(|p| p.user_id == user_id && p.is_completed())
            .cloned()
            .collect())
    }

    async fn completed_since(&self, since: DateTime<Utc>) -> Result<Vec<PredictionRecord>> {
        Ok(self
            .predictions
            .read()
            .iter()
            .filter(|p| p.is_completed() && p.created_at >= since)
            .cloned()
            .collect())
    }

    async fn settle_predictions(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        game_date: NaiveDate,
        winner: Side,
    ) -> Result<u64> {
        let mut settled = 0;
        for prediction in self.predictions.write().iter_mut().filter(|p| {
            p.home_team_id == home_team_id
                && p.away_team_id == away_team_id
                && p.game_date == game_date
                && p.status == PredictionStatus::Pending
        }) {
            prediction.settle(winner)?;
            settled += 1;
        }
        Ok(settled)
    }
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn upsert_game(&self, game: &GameRecord) -> Result<GameRecord> {
        let key = (game.home_team_id, game.away_team_id, game.game_date);
        let mut entry = self.games.entry(key).or_insert_with(|| game.clone());
        entry.status = game.status;
        entry.home_score = game.home_score;
        entry.away_score = game.away_score;
        entry.updated_at = game.updated_at;
        Ok(entry.clone())
    }

    async fn completed_games_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<GameRecord>> {
        let mut games: Vec<GameRecord> = self
            .games
            .iter()
            .filter(|g| g.status == GameStatus::Completed && g.game_date >= from && g.game_date <= to)
            .map(|g| g.value().clone())
            .collect();
        games.sort_by_key(|g| g.game_date);
        Ok(games)
    }
}

#[async_trait]
impl ModelVersionRepository for InMemoryRepository {
    async fn record_version(&self, version: &ModelVersionRecord) -> Result<()> {
        let mut versions = self.versions.write();
        if version.status == VERSION_ACTIVE {
            for previous in versions.iter_mut().filter(|v| v.status == VERSION_ACTIVE) {
                previous.status = VERSION_RETIRED.to_string();
            }
        }
        versions.push(version.clone());
        Ok(())
    }

    async fn list_versions(&self) -> Result<Vec<ModelVersionRecord>> {
        let mut versions = self.versions.read().clone();
        versions.sort_by(|a, b| b.trained_at.cmp(&a.trained_at));
        Ok(versions)
    }

    async fn active_version(&self) -> Result<Option<ModelVersionRecord>> {
        Ok(self
            .list_versions()
            .await?
            .into_iter()
            .find(|v| v.status == VERSION_ACTIVE))
    }
}

#[async_trait]
impl TrainingDataRepository for InMemoryRepository {
    async fn append_samples(&self, samples: &[TrainingSample]) -> Result<u64> {
        let mut stored = self.samples.write();
        let mut inserted = 0;
        for sample in samples {
            if !stored.iter().any(|s| s.game_id == sample.game_id) {
                stored.push(sample.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn load_samples(&self, schema_version: &str) -> Result<Vec<TrainingSample>> {
        let mut samples: Vec<TrainingSample> = self
            .samples
            .read()
            .iter()
            .filter(|s| s.schema_version == schema_version)
            .cloned()
            .collect();
        samples.sort_by_key(|s| (s.game_date, s.collected_at));
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use courtside_models::{ModelPrediction, PredictionRequest};
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()
    }

    fn prediction(user: &str, home_prob: f64) -> PredictionRecord {
        let request = PredictionRequest {
            home_team_id: 1,
            away_team_id: 2,
            game_date: date(),
            user_id: user.to_string(),
        };
        PredictionRecord::pending(
            &request,
            ModelPrediction::from_home_probability(home_prob, "v1").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            let mut record = prediction("u1", 0.6);
            record.created_at = Utc::now() - Duration::minutes(10 - i);
            repo.insert_prediction(&record).await.unwrap();
        }
        repo.insert_prediction(&prediction("u2", 0.6)).await.unwrap();

        let history = repo.history_for_user("u1", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_settlement_happens_once() {
        let repo = InMemoryRepository::new();
        repo.insert_prediction(&prediction("u1", 0.7)).await.unwrap();
        repo.insert_prediction(&prediction("u2", 0.3)).await.unwrap();

        let settled = repo.settle_predictions(1, 2, date(), Side::Home).await.unwrap();
        assert_eq!(settled, 2);
        let again = repo.settle_predictions(1, 2, date(), Side::Away).await.unwrap();
        assert_eq!(again, 0);

        let u1 = repo.completed_for_user("u1").await.unwrap();
        assert_eq!(u1[0].is_correct, Some(true));
        let u2 = repo.completed_for_user("u2").await.unwrap();
        assert_eq!(u2[0].is_correct, Some(false));
    }

    #[tokio::test]
    async fn test_upsert_keeps_game_id() {
        let repo = InMemoryRepository::new();
        let first = repo
            .upsert_game(&GameRecord::completed(1, 2, date(), 99, 98).unwrap())
            .await
            .unwrap();
        let second = repo
            .upsert_game(&GameRecord::completed(1, 2, date(), 101, 98).unwrap())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.home_score, Some(101));
        let games = repo.completed_games_between(date(), date()).await.unwrap();
        assert_eq!(games.len(), 1);
    }

    #[tokio::test]
    async fn test_training_samples_are_append_only() {
        let repo = InMemoryRepository::new();
        let sample = TrainingSample {
            game_id: Uuid::new_v4(),
            game_date: date(),
            schema_version: "v1".into(),
            features: vec![1.0, 2.0],
            home_won: true,
            collected_at: Utc::now(),
        };

        assert_eq!(repo.append_samples(&[sample.clone()]).await.unwrap(), 1);
        let mut relabeled = sample.clone();
        relabeled.home_won = false;
        assert_eq!(repo.append_samples(&[relabeled]).await.unwrap(), 0);

        let stored = repo.load_samples("v1").await.unwrap();
        assert_eq!(stored, vec![sample]);
        assert!(repo.load_samples("v2").await.unwrap().is_empty());
    }

    fn version(name: &str, trained_at: DateTime<Utc>) -> ModelVersionRecord {
        ModelVersionRecord {
            version: name.to_string(),
            schema_version: "v2".into(),
            accuracy: 0.66,
            roc_auc: 0.7,
            trained_at,
            training_samples: 300,
            test_samples: 80,
            status: VERSION_ACTIVE.to_string(),
            deployed_at: trained_at,
        }
    }

    #[tokio::test]
    async fn test_publishing_retires_previous_active_version() {
        let repo = InMemoryRepository::new();
        let t0 = Utc::now() - Duration::days(2);
        repo.record_version(&version("v20250101_000000_000", t0)).await.unwrap();
        repo.record_version(&version("v20250102_000000_000", t0 + Duration::days(1)))
            .await
            .unwrap();

        let versions = repo.list_versions().await.unwrap();
        assert_eq!(versions[0].status, VERSION_ACTIVE);
        assert_eq!(versions[1].status, VERSION_RETIRED);
        assert_eq!(
            repo.active_version().await.unwrap().unwrap().version,
            "v20250102_000000_000"
        );
    }

    #[tokio::test]
    async fn test_non_active_rows_leave_active_version_alone() {
        let repo = InMemoryRepository::new();
        let t0 = Utc::now() - Duration::days(2);
        repo.record_version(&version("v20250101_000000_000", t0)).await.unwrap();
        let mut retired = version("v20250102_000000_000", t0 + Duration::days(1));
        retired.status = VERSION_RETIRED.to_string();
        repo.record_version(&retired).await.unwrap();

        assert_eq!(
            repo.active_version().await.unwrap().unwrap().version,
            "v20250101_000000_000"
        );
        assert!(InMemoryRepository::new().active_version().await.unwrap().is_none());
    }
}

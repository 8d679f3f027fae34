// Prediction service

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use courtside_db::{GameRepository, PredictionRepository};
use courtside_ml::{default_player_schema, FeatureBuilder, ModelRegistry};
use courtside_models::{
    parse_game_lines, season_for, AccuracySummary, CourtsideError, FeatureVector, GameRecord,
    GameResult, HeadToHead, ModelPrediction, PlayerStats, PredictionRecord, PredictionRequest,
    RecentForm, Result, Side, TeamStats,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::ServiceMetrics;
use crate::stats::StatsProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub stats_timeout_ms: u64,
    pub default_history_limit: usize,
    pub max_history_limit: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            stats_timeout_ms: 5000,
            default_history_limit: 50,
            max_history_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionOutcome {
    pub prediction_id: Uuid,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    #[serde(flatten)]
    pub prediction: ModelPrediction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementOutcome {
    pub game_id: Uuid,
    pub winner: Side,
    pub predictions_settled: u64,
}

pub struct PredictionService {
    stats: Arc<dyn StatsProvider>,
    registry: Arc<ModelRegistry>,
    predictions: Arc<dyn PredictionRepository>,
    games: Arc<dyn GameRepository>,
    metrics: Arc<ServiceMetrics>,
    builder: FeatureBuilder,
    config: PredictionConfig,
}

impl PredictionService {
    pub fn new(
        stats: Arc<dyn StatsProvider>,
        registry: Arc<ModelRegistry>,
        predictions: Arc<dyn PredictionRepository>,
        games: Arc<dyn GameRepository>,
        metrics: Arc<ServiceMetrics>,
        config: PredictionConfig,
    ) -> Self {
        Self {
            stats,
            registry,
            predictions,
            games,
            metrics,
            builder: FeatureBuilder::new(),
            config,
        }
    }

    pub fn with_builder(mut self, builder: FeatureBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Fetch stats, build features, score, persist as pending.
    pub async fn predict(&self, request: PredictionRequest) -> Result<PredictionOutcome> {
        let timer = self.metrics.prediction_latency.start_timer();
        let result = self.predict_inner(&request).await;
        timer.observe_duration();

        match &result {
            Ok(outcome) => {
                self.metrics.predictions_total.inc();
                info!(
                    prediction_id = %outcome.prediction_id,
                    home_team_id = request.home_team_id,
                    away_team_id = request.away_team_id,
                    winner = %outcome.prediction.predicted_winner,
                    confidence = outcome.prediction.confidence,
                    model_version = %outcome.prediction.model_version,
                    "Prediction served"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e);
                warn!(
                    home_team_id = request.home_team_id,
                    away_team_id = request.away_team_id,
                    error = %e,
                    "Prediction failed"
                );
            }
        }
        result
    }

    async fn predict_inner(&self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        request.validate()?;

        // Pinned for the whole request, even if a retrain swaps models meanwhile.
        let artifact = self.registry.current()?;

        let (home, away, h2h) = self
            .fetch_matchup(request.home_team_id, request.away_team_id, request.game_date)
            .await?;
        let features = self
            .builder
            .build(&home, &away, &h2h, artifact.feature_schema())?;
        let prediction = artifact.predict(&features)?;

        let record = PredictionRecord::pending(request, prediction.clone());
        self.predictions.insert_prediction(&record).await?;

        Ok(PredictionOutcome {
            prediction_id: record.id,
            home_team_id: request.home_team_id,
            away_team_id: request.away_team_id,
            game_date: request.game_date,
            prediction,
        })
    }

    /// Both teams plus head-to-head as of `game_date`, or
    /// `UpstreamDataUnavailable` if any part fails or the fetch outlives
    /// `stats_timeout_ms`. Recent form and the head-to-head record only count
    /// games finished before `game_date`.
    pub async fn fetch_matchup(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        game_date: NaiveDate,
    ) -> Result<(TeamStats, TeamStats, HeadToHead)> {
        let season = season_for(game_date);
        let fetch = async {
            tokio::try_join!(
                self.stats.team_stats(home_team_id, &season),
                self.stats.team_stats(away_team_id, &season),
                self.stats.team_games(home_team_id, &season),
                self.stats.team_games(away_team_id, &season),
                self.stats.head_to_head(home_team_id, away_team_id),
            )
        };

        let (home, away, home_games, away_games, h2h) =
            tokio::time::timeout(Duration::from_millis(self.config.stats_timeout_ms), fetch)
                .await
                .map_err(|_| CourtsideError::upstream("statistics fetch timed out"))??;

        let home_form = RecentForm::from_games(&parse_game_lines(&home_games)?, home_team_id, game_date);
        let away_form = RecentForm::from_games(&parse_game_lines(&away_games)?, away_team_id, game_date);
        let meetings = parse_game_lines(&h2h)?;

        Ok((
            TeamStats::from_value(&home)?.with_form(home_form),
            TeamStats::from_value(&away)?.with_form(away_form),
            HeadToHead::from_games(&meetings, home_team_id, away_team_id, game_date),
        ))
    }

    /// Page size actually used for a history request.
    pub fn history_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_history_limit)
            .clamp(1, self.config.max_history_limit.max(1))
    }

    /// Newest first. `limit` defaults and is capped by configuration.
    pub async fn history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<PredictionRecord>> {
        self.predictions
            .history_for_user(user_id, self.history_limit(limit))
            .await
    }

    pub async fn accuracy(&self, user_id: &str) -> Result<AccuracySummary> {
        let completed = self.predictions.completed_for_user(user_id).await?;
        Ok(AccuracySummary::from_records(user_id, &completed))
    }

    /// Records a final score and completes the matchup's pending predictions.
    pub async fn settle_game(&self, result: GameResult) -> Result<SettlementOutcome> {
        if result.home_team_id == result.away_team_id {
            return Err(CourtsideError::InvalidInput(
                "a team cannot play itself".to_string(),
            ));
        }
        let winner = Side::from_scores(result.home_score, result.away_score)?;
        let game = GameRecord::completed(
            result.home_team_id,
            result.away_team_id,
            result.game_date,
            result.home_score,
            result.away_score,
        )?;
        let stored = self.games.upsert_game(&game).await?;

        let settled = self
            .predictions
            .settle_predictions(result.home_team_id, result.away_team_id, result.game_date, winner)
            .await?;
        self.metrics.predictions_settled.inc_by(settled);
        info!(
            game_id = %stored.id,
            winner = %winner,
            settled,
            "Game result recorded"
        );

        Ok(SettlementOutcome {
            game_id: stored.id,
            winner,
            predictions_settled: settled,
        })
    }

    pub async fn upcoming_games(&self, date: NaiveDate) -> Result<Value> {
        Ok(self.stats.upcoming_games(date).await?)
    }

    pub async fn player_features(
        &self,
        player_id: i64,
        opponent_team_id: i64,
        game_date: NaiveDate,
    ) -> Result<FeatureVector> {
        let raw = self
            .stats
            .player_stats(player_id, &season_for(game_date))
            .await?;
        let stats = PlayerStats::from_value(&raw)?;
        self.builder
            .build_player(&stats, opponent_team_id, &default_player_schema())
    }
}

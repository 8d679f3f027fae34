#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use courtside_api::AppState;
use courtside_db::InMemoryRepository;
use courtside_ml::{default_game_schema, Estimator, InMemoryArtifactStore, ModelArtifact, ModelRegistry};
use courtside_models::{StatsResult, StatsUnavailable};
use courtside_services::{PredictionConfig, PredictionService, ServiceMetrics, StatsProvider};
use serde_json::{json, Value};

/// Provider returning canned payloads. Team ids listed in `down` are unavailable.
pub struct StubStats {
    pub down: Vec<i64>,
}

impl StubStats {
    pub fn healthy() -> Self {
        Self { down: vec![] }
    }
}

pub fn team_payload(team_id: i64) -> Value {
    let strength = (team_id % 7) as f64 / 10.0;
    json!({
        "team_id": team_id,
        "win_pct": 0.35 + strength,
        "avg_points": 105.0 + strength * 20.0,
        "avg_points_allowed": 112.0 - strength * 10.0
    })
}

fn game_line(date: NaiveDate, home: i64, away: i64, home_score: i32, away_score: i32) -> Value {
    json!({
        "date": date,
        "home_team_id": home,
        "away_team_id": away,
        "home_score": home_score,
        "away_score": away_score,
        "finished": true
    })
}

/// A finished game every third day over the last three weeks.
pub fn schedule_payload(team_id: i64) -> Value {
    let today = Utc::now().date_naive();
    let games: Vec<Value> = (1..=7)
        .map(|i| {
            let date = today - Duration::days(3 * i + (team_id % 3));
            let margin = if (i + team_id) % 2 == 0 { 6 } else { -4 };
            game_line(date, team_id, team_id + 100, 105 + margin, 105)
        })
        .collect();
    Value::Array(games)
}

#[async_trait]
impl StatsProvider for StubStats {
    async fn team_stats(&self, team_id: i64, _season: &str) -> StatsResult<Value> {
        if self.down.contains(&team_id) {
            return Err(StatsUnavailable::new(format!("team {team_id} unavailable")));
        }
        Ok(team_payload(team_id))
    }

    async fn player_stats(&self, player_id: i64, _season: &str) -> StatsResult<Value> {
        Ok(json!({
            "player_id": player_id,
            "avg_points": 24.5, "avg_rebounds": 5.1, "avg_assists": 7.3,
            "avg_steals": 1.1, "avg_blocks": 0.4, "fg_percentage": 0.48,
            "three_pt_percentage": 0.37, "ft_percentage": 0.88,
            "minutes_per_game": 34.2, "games_played": 58,
            "avg_fga": 18.2, "avg_fta": 6.4, "avg_turnovers": 3.1
        }))
    }

    async fn upcoming_games(&self, date: NaiveDate) -> StatsResult<Value> {
        Ok(json!([{
            "game_id": 1001,
            "date": date,
            "home_team_id": 1,
            "away_team_id": 2,
            "home_score": null,
            "away_score": null,
            "finished": false
        }]))
    }

    async fn team_games(&self, team_id: i64, _season: &str) -> StatsResult<Value> {
        if self.down.contains(&team_id) {
            return Err(StatsUnavailable::new(format!("team {team_id} unavailable")));
        }
        Ok(schedule_payload(team_id))
    }

    async fn head_to_head(&self, team_a: i64, team_b: i64) -> StatsResult<Value> {
        let today = Utc::now().date_naive();
        Ok(json!([
            game_line(today - Duration::days(40), team_a, team_b, 110, 101),
            game_line(today - Duration::days(70), team_b, team_a, 99, 97),
            game_line(today - Duration::days(95), team_a, team_b, 104, 108)
        ]))
    }
}

#[derive(Debug)]
pub struct FixedEstimator(pub f64);

impl Estimator for FixedEstimator {
    fn model_name(&self) -> &str {
        "Fixed"
    }

    fn n_features(&self) -> usize {
        default_game_schema().len()
    }

    fn predict_home_win(&self, _features: &[f64]) -> f64 {
        self.0
    }
}

pub fn fixed_artifact(version: &str, home_win: f64) -> ModelArtifact {
    ModelArtifact::new(
        version,
        Arc::new(FixedEstimator(home_win)),
        default_game_schema(),
        Utc::now(),
        0.68,
    )
    .unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub registry: Arc<ModelRegistry>,
}

pub async fn test_app(stats: StubStats, artifact: Option<ModelArtifact>) -> TestApp {
    let store = Arc::new(InMemoryArtifactStore::new());
    let registry = Arc::new(ModelRegistry::new(store.clone()));
    if let Some(artifact) = artifact {
        let version = artifact.version().to_string();
        store.insert(artifact);
        registry.load(&version).await.unwrap();
    }

    let repo = Arc::new(InMemoryRepository::new());
    let metrics = Arc::new(ServiceMetrics::new().unwrap());
    let service = Arc::new(PredictionService::new(
        Arc::new(stats),
        registry.clone(),
        repo.clone(),
        repo.clone(),
        metrics.clone(),
        PredictionConfig::default(),
    ));

    TestApp {
        state: AppState::new(service, repo.clone(), metrics),
        repo,
        registry,
    }
}

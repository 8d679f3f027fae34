//! External basketball statistics provider.
//!
//! Every call returns either a normalized payload or `StatsUnavailable`;
//! nothing here invents numbers when the upstream is down. Team and player
//! calls yield flat aggregates, schedule calls yield game-line lists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use courtside_cache::{
    games_key, head_to_head_key, player_stats_key, team_games_key, team_stats_key, CacheTtls,
    StatsCache,
};
use courtside_models::{season_for, CourtsideError, Result, StatsResult, StatsUnavailable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api_sports;

#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn team_stats(&self, team_id: i64, season: &str) -> StatsResult<Value>;
    async fn player_stats(&self, player_id: i64, season: &str) -> StatsResult<Value>;
    async fn upcoming_games(&self, date: NaiveDate) -> StatsResult<Value>;
    /// Every game of `team_id` in `season`, played or scheduled.
    async fn team_games(&self, team_id: i64, season: &str) -> StatsResult<Value>;
    /// Meetings between the two teams, in either venue.
    async fn head_to_head(&self, team_a: i64, team_b: i64) -> StatsResult<Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsApiConfig {
    pub base_url: String,
    pub api_host: String,
    pub api_key: String,
    pub league: String,
    pub timeout_ms: u64,
}

impl Default for StatsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v1.basketball.api-sports.io".to_string(),
            api_host: "v1.basketball.api-sports.io".to_string(),
            api_key: String::new(),
            league: "12".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// api-sports style HTTP client.
pub struct HttpStatsProvider {
    client: reqwest::Client,
    config: StatsApiConfig,
}

impl HttpStatsProvider {
    pub fn new(config: StatsApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("courtside-rs/0.1")
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CourtsideError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> StatsResult<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .send()
            .await
            .map_err(|e| StatsUnavailable::new(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsUnavailable::new(format!("{path} returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StatsUnavailable::new(format!("{path} returned invalid JSON: {e}")))?;
        unwrap_envelope(path, body)
    }
}

/// Strips the `{errors, response}` envelope the provider wraps payloads in.
fn unwrap_envelope(path: &str, body: Value) -> StatsResult<Value> {
    let has_errors = match body.get("errors") {
        Some(Value::Array(errors)) => !errors.is_empty(),
        Some(Value::Object(errors)) => !errors.is_empty(),
        _ => false,
    };
    if has_errors {
        let detail = body.get("errors").map(Value::to_string).unwrap_or_default();
        return Err(StatsUnavailable::new(format!("{path} reported errors: {detail}")));
    }

    match body {
        Value::Object(mut map) if map.contains_key("response") => match map.remove("response") {
            Some(Value::Null) | None => Err(StatsUnavailable::new(format!("{path} returned no data"))),
            Some(payload) => Ok(payload),
        },
        Value::Null => Err(StatsUnavailable::new(format!("{path} returned no data"))),
        other => Ok(other),
    }
}

#[async_trait]
impl StatsProvider for HttpStatsProvider {
    async fn team_stats(&self, team_id: i64, season: &str) -> StatsResult<Value> {
        let response = self
            .get_json(
                "/statistics",
                &[
                    ("team", team_id.to_string()),
                    ("season", season.to_string()),
                    ("league", self.config.league.clone()),
                ],
            )
            .await?;
        api_sports::team_statistics(team_id, &response)
    }

    async fn player_stats(&self, player_id: i64, season: &str) -> StatsResult<Value> {
        let response = self
            .get_json(
                "/players/statistics",
                &[("id", player_id.to_string()), ("season", season.to_string())],
            )
            .await?;
        api_sports::player_averages(player_id, &response)
    }

    async fn upcoming_games(&self, date: NaiveDate) -> StatsResult<Value> {
        let response = self
            .get_json(
                "/games",
                &[
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("league", self.config.league.clone()),
                    ("season", season_for(date)),
                ],
            )
            .await?;
        api_sports::game_lines(&response)
    }

    async fn team_games(&self, team_id: i64, season: &str) -> StatsResult<Value> {
        let response = self
            .get_json(
                "/games",
                &[
                    ("team", team_id.to_string()),
                    ("league", self.config.league.clone()),
                    ("season", season.to_string()),
                ],
            )
            .await?;
        api_sports::game_lines(&response)
    }

    async fn head_to_head(&self, team_a: i64, team_b: i64) -> StatsResult<Value> {
        let response = self
            .get_json("/games/h2h", &[("h2h", format!("{team_a}-{team_b}"))])
            .await?;
        api_sports::game_lines(&response)
    }
}

/// Read-through cache in front of another provider. Cache failures degrade
/// to an upstream call; unavailable results are never cached.
pub struct CachedStatsProvider {
    upstream: Arc<dyn StatsProvider>,
    cache: Arc<dyn StatsCache>,
    ttls: CacheTtls,
}

impl CachedStatsProvider {
    pub fn new(upstream: Arc<dyn StatsProvider>, cache: Arc<dyn StatsCache>, ttls: CacheTtls) -> Self {
        Self {
            upstream,
            cache,
            ttls,
        }
    }

    async fn lookup(&self, key: &str) -> Option<Value> {
        match self.cache.get(key).await {
            Ok(Some(value)) => {
                debug!(key, "Stats cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Stats cache read failed, going upstream");
                None
            }
        }
    }

    async fn store(&self, key: &str, value: &Value, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            warn!(key, error = %e, "Stats cache write failed");
        }
    }
}

#[async_trait]
impl StatsProvider for CachedStatsProvider {
    async fn team_stats(&self, team_id: i64, season: &str) -> StatsResult<Value> {
        let key = team_stats_key(team_id, season);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }
        let value = self.upstream.team_stats(team_id, season).await?;
        self.store(&key, &value, self.ttls.team_stats()).await;
        Ok(value)
    }

    async fn player_stats(&self, player_id: i64, season: &str) -> StatsResult<Value> {
        let key = player_stats_key(player_id, season);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }
        let value = self.upstream.player_stats(player_id, season).await?;
        self.store(&key, &value, self.ttls.player_stats()).await;
        Ok(value)
    }

    async fn upcoming_games(&self, date: NaiveDate) -> StatsResult<Value> {
        let key = games_key(date);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }
        let value = self.upstream.upcoming_games(date).await?;
        self.store(&key, &value, self.ttls.games()).await;
        Ok(value)
    }

    async fn team_games(&self, team_id: i64, season: &str) -> StatsResult<Value> {
        let key = team_games_key(team_id, season);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }
        let value = self.upstream.team_games(team_id, season).await?;
        self.store(&key, &value, self.ttls.games()).await;
        Ok(value)
    }

    async fn head_to_head(&self, team_a: i64, team_b: i64) -> StatsResult<Value> {
        let key = head_to_head_key(team_a, team_b);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }
        let value = self.upstream.head_to_head(team_a, team_b).await?;
        self.store(&key, &value, self.ttls.head_to_head()).await;
        Ok(value)
    }
}

//! Deterministic cache keys and per-entity time-to-live values.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub fn team_stats_key(team_id: i64, season: &str) -> String {
    format!("team_stats:{team_id}:{season}")
}

pub fn player_stats_key(player_id: i64, season: &str) -> String {
    format!("player_stats:{player_id}:{season}")
}

pub fn games_key(date: NaiveDate) -> String {
    format!("games:{}", date.format("%Y-%m-%d"))
}

pub fn team_games_key(team_id: i64, season: &str) -> String {
    format!("team_games:{team_id}:{season}")
}

pub fn head_to_head_key(team_a: i64, team_b: i64) -> String {
    format!("h2h:{team_a}:{team_b}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheTtls {
    pub team_stats_secs: u64,
    pub player_stats_secs: u64,
    pub games_secs: u64,
    pub head_to_head_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            team_stats_secs: 3600,
            player_stats_secs: 3600,
            games_secs: 1800,
            head_to_head_secs: 7200,
        }
    }
}

impl CacheTtls {
    pub fn team_stats(&self) -> Duration {
        Duration::from_secs(self.team_stats_secs)
    }

    pub fn player_stats(&self) -> Duration {
        Duration::from_secs(self.player_stats_secs)
    }

    pub fn games(&self) -> Duration {
        Duration::from_secs(self.games_secs)
    }

    pub fn head_to_head(&self) -> Duration {
        Duration::from_secs(self.head_to_head_secs)
    }
}

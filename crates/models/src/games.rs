use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CourtsideError, Result};
use crate::predictions::Side;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Completed,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::Completed => "completed",
        }
    }
}

impl FromStr for GameStatus {
    type Err = CourtsideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(GameStatus::Scheduled),
            "completed" => Ok(GameStatus::Completed),
            other => Err(CourtsideError::InvalidInput(format!("unknown game status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: Uuid,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub season: String,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn completed(
        home_team_id: i64,
        away_team_id: i64,
        game_date: NaiveDate,
        home_score: i32,
        away_score: i32,
    ) -> Result<Self> {
        // Rejects ties before anything is stored.
        Side::from_scores(home_score, away_score)?;
        Ok(Self {
            id: Uuid::new_v4(),
            home_team_id,
            away_team_id,
            game_date,
            season: crate::stats::season_for(game_date),
            status: GameStatus::Completed,
            home_score: Some(home_score),
            away_score: Some(away_score),
            updated_at: Utc::now(),
        })
    }

    /// The realized winner, once both scores are known.
    pub fn winner(&self) -> Option<Side> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Side::from_scores(home, away).ok(),
            _ => None,
        }
    }
}

/// Reported result of a finished game, as submitted by the settlement process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameResult {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub game_date: NaiveDate,
    pub home_score: i32,
    pub away_score: i32,
}

//! Statistics in the normalized shape the stats provider hands out.
//!
//! Every aggregate field is optional: presence is validated by the feature
//! builder, never filled in with representative constants here. Recent form
//! and head-to-head records are derived from game lines, counting only games
//! played strictly before the date being predicted.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CourtsideError, Result};

/// Finished games counted as recent form.
pub const RECENT_FORM_GAMES: usize = 5;

/// Rest is capped here; a team with no earlier game this season gets the cap.
pub const MAX_REST_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TeamStats {
    pub team_id: Option<i64>,
    pub win_pct: Option<f64>,
    pub avg_points: Option<f64>,
    pub avg_points_allowed: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub last_5_wins: Option<f64>,
    pub days_rest: Option<f64>,
    pub injury_impact: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeadToHead {
    pub home_wins: Option<f64>,
    pub away_wins: Option<f64>,
    pub avg_point_diff: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStats {
    pub player_id: Option<i64>,
    pub avg_points: Option<f64>,
    pub avg_rebounds: Option<f64>,
    pub avg_assists: Option<f64>,
    pub avg_steals: Option<f64>,
    pub avg_blocks: Option<f64>,
    pub fg_percentage: Option<f64>,
    pub three_pt_percentage: Option<f64>,
    pub ft_percentage: Option<f64>,
    pub minutes_per_game: Option<f64>,
    pub games_played: Option<f64>,
    pub avg_fga: Option<f64>,
    pub avg_fta: Option<f64>,
    pub avg_turnovers: Option<f64>,
}

fn parse_object<T: for<'de> Deserialize<'de>>(value: &Value, what: &str) -> Result<T> {
    if !value.is_object() {
        return Err(CourtsideError::upstream(format!(
            "{what} payload is not an object"
        )));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| CourtsideError::upstream(format!("malformed {what} payload: {e}")))
}

/// One game from a schedule or results list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameLine {
    pub game_id: Option<i64>,
    pub date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    #[serde(default)]
    pub finished: bool,
}

impl GameLine {
    pub fn involves(&self, team_id: i64) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// `(points_for, points_against)` from `team_id`'s side of a finished game.
    pub fn score_for(&self, team_id: i64) -> Option<(i32, i32)> {
        if !self.finished {
            return None;
        }
        let (home, away) = (self.home_score?, self.away_score?);
        if team_id == self.home_team_id {
            Some((home, away))
        } else if team_id == self.away_team_id {
            Some((away, home))
        } else {
            None
        }
    }
}

pub fn parse_game_lines(value: &Value) -> Result<Vec<GameLine>> {
    if !value.is_array() {
        return Err(CourtsideError::upstream("game list payload is not an array"));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| CourtsideError::upstream(format!("malformed game list payload: {e}")))
}

/// Wins in the last few finished games and days of rest before `before`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentForm {
    pub last_5_wins: f64,
    pub days_rest: f64,
}

impl RecentForm {
    pub fn from_games(games: &[GameLine], team_id: i64, before: NaiveDate) -> Self {
        let mut played: Vec<(NaiveDate, i32, i32)> = games
            .iter()
            .filter(|g| g.date < before)
            .filter_map(|g| g.score_for(team_id).map(|(pf, pa)| (g.date, pf, pa)))
            .collect();
        played.sort_by(|a, b| b.0.cmp(&a.0));

        let wins = played
            .iter()
            .take(RECENT_FORM_GAMES)
            .filter(|(_, pf, pa)| pf > pa)
            .count();
        // Back-to-back games mean zero days of rest.
        let days_rest = played.first().map_or(MAX_REST_DAYS, |(last, _, _)| {
            ((before - *last).num_days() - 1).clamp(0, MAX_REST_DAYS)
        });

        Self {
            last_5_wins: wins as f64,
            days_rest: days_rest as f64,
        }
    }
}

impl TeamStats {
    pub fn from_value(value: &Value) -> Result<Self> {
        parse_object(value, "team stats")
    }

    pub fn with_form(mut self, form: RecentForm) -> Self {
        self.last_5_wins = Some(form.last_5_wins);
        self.days_rest = Some(form.days_rest);
        self
    }
}

impl HeadToHead {
    /// Record of `home_team_id` against `away_team_id`, whatever the venue,
    /// over finished meetings before `before`. No meetings is a 0-0 record
    /// with a 0 point differential.
    pub fn from_games(
        games: &[GameLine],
        home_team_id: i64,
        away_team_id: i64,
        before: NaiveDate,
    ) -> Self {
        let mut home_wins = 0u32;
        let mut away_wins = 0u32;
        let mut margin = 0i64;
        let mut meetings = 0u32;

        for game in games
            .iter()
            .filter(|g| g.date < before && g.involves(home_team_id) && g.involves(away_team_id))
        {
            let Some((pf, pa)) = game.score_for(home_team_id) else {
                continue;
            };
            meetings += 1;
            margin += i64::from(pf - pa);
            if pf > pa {
                home_wins += 1;
            } else if pa > pf {
                away_wins += 1;
            }
        }

        let avg_point_diff = if meetings == 0 {
            0.0
        } else {
            margin as f64 / f64::from(meetings)
        };
        Self {
            home_wins: Some(f64::from(home_wins)),
            away_wins: Some(f64::from(away_wins)),
            avg_point_diff: Some(avg_point_diff),
        }
    }
}

impl PlayerStats {
    pub fn from_value(value: &Value) -> Result<Self> {
        parse_object(value, "player stats")
    }
}

/// Season label for a game date, e.g. `2024-2025`. Seasons start in October.
pub fn season_for(date: NaiveDate) -> String {
    let start_year = if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{}", start_year, start_year + 1)
}

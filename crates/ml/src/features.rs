//! Feature engineering.
//!
//! Turns raw team, head-to-head and player statistics into fixed-order
//! numeric vectors. Everything here is pure: no I/O, and the same inputs
//! always produce bit-identical outputs.

use courtside_models::{
    CourtsideError, FeatureSchema, FeatureVector, HeadToHead, PlayerStats, Result, TeamStats,
};

pub const GAME_SCHEMA_VERSION: &str = "v2";
pub const PLAYER_SCHEMA_VERSION: &str = "player-v1";

/// Denominators smaller than this yield the 0 sentinel.
pub const DENOMINATOR_EPSILON: f64 = 1e-9;

/// Canonical game schema. Every field is backed by provider season totals or
/// game results. Ratings and injury impact stay available to custom schemas
/// for providers that publish them.
pub const GAME_FEATURES: [&str; 20] = [
    "home_win_pct",
    "home_avg_points",
    "home_avg_points_allowed",
    "away_win_pct",
    "away_avg_points",
    "away_avg_points_allowed",
    "h2h_home_wins",
    "h2h_away_wins",
    "h2h_avg_point_diff",
    "home_last_5_wins",
    "away_last_5_wins",
    "home_days_rest",
    "away_days_rest",
    "point_differential",
    "defensive_differential",
    "win_pct_differential",
    "rest_advantage",
    "h2h_home_win_rate",
    "home_scoring_margin",
    "away_scoring_margin",
];

pub const PLAYER_FEATURES: [&str; 13] = [
    "avg_points",
    "avg_rebounds",
    "avg_assists",
    "avg_steals",
    "avg_blocks",
    "fg_percentage",
    "three_pt_percentage",
    "ft_percentage",
    "minutes_per_game",
    "games_played",
    "opponent_team_id",
    "true_shooting_pct",
    "usage_rate",
];

pub fn default_game_schema() -> FeatureSchema {
    FeatureSchema::new(
        GAME_SCHEMA_VERSION,
        GAME_FEATURES.iter().map(|f| (*f).to_string()).collect(),
    )
}

pub fn default_player_schema() -> FeatureSchema {
    FeatureSchema::new(
        PLAYER_SCHEMA_VERSION,
        PLAYER_FEATURES.iter().map(|f| (*f).to_string()).collect(),
    )
}

/// Division that returns 0 instead of blowing up on a near-zero denominator.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < DENOMINATOR_EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// What to do when a raw input a feature depends on is absent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MissingFieldPolicy {
    #[default]
    Reject,
    DefaultTo(f64),
}

#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    policy: MissingFieldPolicy,
}

struct GameInputs<'a> {
    home: &'a TeamStats,
    away: &'a TeamStats,
    h2h: &'a HeadToHead,
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MissingFieldPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingFieldPolicy {
        self.policy
    }

    /// Builds the game feature vector in exactly the order of `schema`.
    pub fn build(
        &self,
        home: &TeamStats,
        away: &TeamStats,
        h2h: &HeadToHead,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector> {
        let inputs = GameInputs { home, away, h2h };
        let values = schema
            .fields
            .iter()
            .map(|name| self.game_feature(name, &inputs))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureVector {
            schema_version: schema.version.clone(),
            names: schema.fields.clone(),
            values,
        })
    }

    /// Builds a player feature vector in exactly the order of `schema`.
    pub fn build_player(
        &self,
        player: &PlayerStats,
        opponent_team_id: i64,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector> {
        let values = schema
            .fields
            .iter()
            .map(|name| self.player_feature(name, player, opponent_team_id))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureVector {
            schema_version: schema.version.clone(),
            names: schema.fields.clone(),
            values,
        })
    }

    fn require(&self, value: Option<f64>, field: &str) -> Result<f64> {
        match (value.filter(|v| v.is_finite()), self.policy) {
            (Some(v), _) => Ok(v),
            (None, MissingFieldPolicy::DefaultTo(default)) => Ok(default),
            (None, MissingFieldPolicy::Reject) => Err(CourtsideError::schema_mismatch(format!(
                "required input '{field}' is missing"
            ))),
        }
    }

    fn game_feature(&self, name: &str, inputs: &GameInputs<'_>) -> Result<f64> {
        let GameInputs { home, away, h2h } = inputs;
        let value = match name {
            "home_win_pct" => self.require(home.win_pct, "home.win_pct")?,
            "home_avg_points" => self.require(home.avg_points, "home.avg_points")?,
            "home_avg_points_allowed" => {
                self.require(home.avg_points_allowed, "home.avg_points_allowed")?
            }
            "home_offensive_rating" => {
                self.require(home.offensive_rating, "home.offensive_rating")?
            }
            "home_defensive_rating" => {
                self.require(home.defensive_rating, "home.defensive_rating")?
            }
            "away_win_pct" => self.require(away.win_pct, "away.win_pct")?,
            "away_avg_points" => self.require(away.avg_points, "away.avg_points")?,
            "away_avg_points_allowed" => {
                self.require(away.avg_points_allowed, "away.avg_points_allowed")?
            }
            "away_offensive_rating" => {
                self.require(away.offensive_rating, "away.offensive_rating")?
            }
            "away_defensive_rating" => {
                self.require(away.defensive_rating, "away.defensive_rating")?
            }
            "h2h_home_wins" => self.require(h2h.home_wins, "h2h.home_wins")?,
            "h2h_away_wins" => self.require(h2h.away_wins, "h2h.away_wins")?,
            "h2h_avg_point_diff" => self.require(h2h.avg_point_diff, "h2h.avg_point_diff")?,
            "home_last_5_wins" => self.require(home.last_5_wins, "home.last_5_wins")?,
            "away_last_5_wins" => self.require(away.last_5_wins, "away.last_5_wins")?,
            "home_days_rest" => self.require(home.days_rest, "home.days_rest")?,
            "away_days_rest" => self.require(away.days_rest, "away.days_rest")?,
            "home_injury_impact" => self.require(home.injury_impact, "home.injury_impact")?,
            "away_injury_impact" => self.require(away.injury_impact, "away.injury_impact")?,
            "point_differential" => {
                self.require(home.avg_points, "home.avg_points")?
                    - self.require(away.avg_points, "away.avg_points")?
            }
            "defensive_differential" => {
                self.require(away.avg_points_allowed, "away.avg_points_allowed")?
                    - self.require(home.avg_points_allowed, "home.avg_points_allowed")?
            }
            "win_pct_differential" => {
                self.require(home.win_pct, "home.win_pct")?
                    - self.require(away.win_pct, "away.win_pct")?
            }
            "rest_advantage" => {
                self.require(home.days_rest, "home.days_rest")?
                    - self.require(away.days_rest, "away.days_rest")?
            }
            "h2h_home_win_rate" => {
                let home_wins = self.require(h2h.home_wins, "h2h.home_wins")?;
                let away_wins = self.require(h2h.away_wins, "h2h.away_wins")?;
                safe_div(home_wins, home_wins + away_wins)
            }
            "home_net_rating" => {
                self.require(home.offensive_rating, "home.offensive_rating")?
                    - self.require(home.defensive_rating, "home.defensive_rating")?
            }
            "away_net_rating" => {
                self.require(away.offensive_rating, "away.offensive_rating")?
                    - self.require(away.defensive_rating, "away.defensive_rating")?
            }
            "home_scoring_margin" => {
                self.require(home.avg_points, "home.avg_points")?
                    - self.require(home.avg_points_allowed, "home.avg_points_allowed")?
            }
            "away_scoring_margin" => {
                self.require(away.avg_points, "away.avg_points")?
                    - self.require(away.avg_points_allowed, "away.avg_points_allowed")?
            }
            unknown => {
                return Err(CourtsideError::schema_mismatch(format!(
                    "unknown game feature '{unknown}'"
                )))
            }
        };
        Ok(value)
    }

    fn player_feature(&self, name: &str, player: &PlayerStats, opponent_team_id: i64) -> Result<f64> {
        let value = match name {
            "avg_points" => self.require(player.avg_points, "player.avg_points")?,
            "avg_rebounds" => self.require(player.avg_rebounds, "player.avg_rebounds")?,
            "avg_assists" => self.require(player.avg_assists, "player.avg_assists")?,
            "avg_steals" => self.require(player.avg_steals, "player.avg_steals")?,
            "avg_blocks" => self.require(player.avg_blocks, "player.avg_blocks")?,
            "fg_percentage" => self.require(player.fg_percentage, "player.fg_percentage")?,
            "three_pt_percentage" => {
                self.require(player.three_pt_percentage, "player.three_pt_percentage")?
            }
            "ft_percentage" => self.require(player.ft_percentage, "player.ft_percentage")?,
            "minutes_per_game" => {
                self.require(player.minutes_per_game, "player.minutes_per_game")?
            }
            "games_played" => self.require(player.games_played, "player.games_played")?,
            "opponent_team_id" => opponent_team_id as f64,
            "true_shooting_pct" => {
                let points = self.require(player.avg_points, "player.avg_points")?;
                let fga = self.require(player.avg_fga, "player.avg_fga")?;
                let fta = self.require(player.avg_fta, "player.avg_fta")?;
                true_shooting(points, fga, fta)
            }
            "usage_rate" => {
                let fga = self.require(player.avg_fga, "player.avg_fga")?;
                let fta = self.require(player.avg_fta, "player.avg_fta")?;
                let turnovers = self.require(player.avg_turnovers, "player.avg_turnovers")?;
                let minutes = self.require(player.minutes_per_game, "player.minutes_per_game")?;
                usage_rate(fga, fta, turnovers, minutes)
            }
            unknown => {
                return Err(CourtsideError::schema_mismatch(format!(
                    "unknown player feature '{unknown}'"
                )))
            }
        };
        Ok(value)
    }
}

/// Points per true shooting attempt, halved: `pts / (2 * (fga + 0.44 * fta))`.
pub fn true_shooting(points: f64, fga: f64, fta: f64) -> f64 {
    safe_div(points, 2.0 * (fga + 0.44 * fta))
}

/// Possessions used per minute, scaled to 100.
pub fn usage_rate(fga: f64, fta: f64, turnovers: f64, minutes: f64) -> f64 {
    100.0 * safe_div(fga + 0.44 * fta + turnovers, minutes)
}

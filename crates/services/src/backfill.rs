//! Seeds the training set from a file of historical results.
//!
//! Each game is featurized from the games before it: season-to-date records
//! and scoring averages, recent form and head-to-head, so no sample sees its
//! own outcome. A game whose teams have no earlier game that season has no
//! aggregates and is skipped.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use courtside_db::{GameRepository, TrainingDataRepository};
use courtside_ml::FeatureBuilder;
use courtside_models::{
    season_for, CourtsideError, FeatureSchema, GameLine, GameRecord, GameResult, HeadToHead,
    RecentForm, Result, Side, TeamStats, TrainingSample,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const COLUMNS: [&str; 5] = [
    "game_date",
    "home_team_id",
    "away_team_id",
    "home_score",
    "away_score",
];

/// Reads `game_date,home_team_id,away_team_id,home_score,away_score` rows.
/// Columns may come in any order and extra columns are ignored.
pub fn parse_results_csv(input: &str) -> Result<Vec<GameResult>> {
    let mut lines = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| CourtsideError::InvalidInput("results file is empty".to_string()))?;
    let header: Vec<&str> = header.split(',').map(str::trim).collect();
    let mut index = [0usize; COLUMNS.len()];
    for (slot, column) in index.iter_mut().zip(COLUMNS) {
        *slot = header.iter().position(|h| *h == column).ok_or_else(|| {
            CourtsideError::InvalidInput(format!("results file has no `{column}` column"))
        })?;
    }

    lines
        .map(|(n, line)| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |i: usize| {
                fields.get(index[i]).copied().ok_or_else(|| {
                    CourtsideError::InvalidInput(format!("line {}: missing `{}`", n + 1, COLUMNS[i]))
                })
            };
            let bad = |i: usize| {
                CourtsideError::InvalidInput(format!("line {}: invalid `{}`", n + 1, COLUMNS[i]))
            };

            let result = GameResult {
                game_date: NaiveDate::parse_from_str(field(0)?, "%Y-%m-%d").map_err(|_| bad(0))?,
                home_team_id: field(1)?.parse().map_err(|_| bad(1))?,
                away_team_id: field(2)?.parse().map_err(|_| bad(2))?,
                home_score: field(3)?.parse().map_err(|_| bad(3))?,
                away_score: field(4)?.parse().map_err(|_| bad(4))?,
            };
            if result.home_team_id == result.away_team_id {
                return Err(CourtsideError::InvalidInput(format!(
                    "line {}: a team cannot play itself",
                    n + 1
                )));
            }
            Side::from_scores(result.home_score, result.away_score)
                .map_err(|e| CourtsideError::InvalidInput(format!("line {}: {e}", n + 1)))?;
            Ok(result)
        })
        .collect()
}

fn as_line(result: &GameResult) -> GameLine {
    GameLine {
        game_id: None,
        date: result.game_date,
        home_team_id: result.home_team_id,
        away_team_id: result.away_team_id,
        home_score: Some(result.home_score),
        away_score: Some(result.away_score),
        finished: true,
    }
}

/// Season-to-date aggregates of `team_id` from finished games before `before`.
fn season_to_date(lines: &[GameLine], team_id: i64, before: NaiveDate) -> Option<TeamStats> {
    let season = season_for(before);
    let scores: Vec<(i32, i32)> = lines
        .iter()
        .filter(|l| l.date < before && season_for(l.date) == season)
        .filter_map(|l| l.score_for(team_id))
        .collect();
    if scores.is_empty() {
        return None;
    }

    let n = scores.len() as f64;
    let wins = scores.iter().filter(|(pf, pa)| pf > pa).count() as f64;
    let scored: f64 = scores.iter().map(|(pf, _)| f64::from(*pf)).sum();
    let allowed: f64 = scores.iter().map(|(_, pa)| f64::from(*pa)).sum();
    Some(TeamStats {
        team_id: Some(team_id),
        win_pct: Some(wins / n),
        avg_points: Some(scored / n),
        avg_points_allowed: Some(allowed / n),
        ..TeamStats::default()
    })
}

/// Features of `result` computed from `lines`, the full result history.
pub fn featurize_result(
    builder: &FeatureBuilder,
    schema: &FeatureSchema,
    lines: &[GameLine],
    result: &GameResult,
) -> Result<Option<Vec<f64>>> {
    let date = result.game_date;
    let (Some(home), Some(away)) = (
        season_to_date(lines, result.home_team_id, date),
        season_to_date(lines, result.away_team_id, date),
    ) else {
        return Ok(None);
    };

    let home = home.with_form(RecentForm::from_games(lines, result.home_team_id, date));
    let away = away.with_form(RecentForm::from_games(lines, result.away_team_id, date));
    let h2h = HeadToHead::from_games(lines, result.home_team_id, result.away_team_id, date);
    Ok(Some(builder.build(&home, &away, &h2h, schema)?.values))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub results: usize,
    pub skipped: usize,
    pub appended: u64,
}

pub struct HistoryBackfill {
    games: Arc<dyn GameRepository>,
    training_data: Arc<dyn TrainingDataRepository>,
    builder: FeatureBuilder,
    schema: FeatureSchema,
}

impl HistoryBackfill {
    pub fn new(
        games: Arc<dyn GameRepository>,
        training_data: Arc<dyn TrainingDataRepository>,
        schema: FeatureSchema,
    ) -> Self {
        Self {
            games,
            training_data,
            builder: FeatureBuilder::new(),
            schema,
        }
    }

    /// Records every result as a completed game and appends a labeled sample
    /// for each one that has enough history. Re-importing the same file adds
    /// nothing: games keep their ids and samples are keyed by game.
    pub async fn import(&self, results: &[GameResult]) -> Result<BackfillReport> {
        let lines: Vec<GameLine> = results.iter().map(as_line).collect();
        let collected_at = Utc::now();

        let mut samples = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for result in results {
            let stored = self
                .games
                .upsert_game(&GameRecord::completed(
                    result.home_team_id,
                    result.away_team_id,
                    result.game_date,
                    result.home_score,
                    result.away_score,
                )?)
                .await?;

            let Some(features) = featurize_result(&self.builder, &self.schema, &lines, result)? else {
                debug!(game_id = %stored.id, date = %result.game_date, "No earlier games this season");
                skipped += 1;
                continue;
            };
            samples.push(TrainingSample {
                game_id: stored.id,
                game_date: result.game_date,
                schema_version: self.schema.version.clone(),
                features,
                home_won: result.home_score > result.away_score,
                collected_at,
            });
        }

        let appended = self.training_data.append_samples(&samples).await?;
        info!(
            results = results.len(),
            skipped,
            appended,
            "Imported historical results"
        );
        Ok(BackfillReport {
            results: results.len(),
            skipped,
            appended,
        })
    }
}

//! Maps api-sports basketball payloads onto the normalized shapes the rest of
//! the service reads: flat team season aggregates, averaged player lines and
//! lists of game lines.
//!
//! Values the provider does not publish are left out, so the feature builder
//! rejects them instead of seeing a stand-in.

use chrono::{DateTime, NaiveDate};
use courtside_models::{StatsResult, StatsUnavailable};
use serde_json::{json, Value};
use tracing::debug;

/// Status codes of games with a final score.
const FINISHED_STATUSES: [&str; 2] = ["FT", "AOT"];

/// Reads a number the provider may send as a JSON number or a numeric string.
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    };
    parsed.filter(|v: &f64| v.is_finite())
}

fn first_number(row: &Value, pointers: &[&str]) -> Option<f64> {
    pointers.iter().find_map(|p| number(row.pointer(p)))
}

/// Percentages arrive either as fractions or as 0-100 values.
fn as_fraction(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// `"34:12"` or `"34"` minutes on the floor.
fn minutes(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => {
            let mut parts = s.trim().splitn(2, ':');
            let whole: f64 = parts.next()?.trim().parse().ok()?;
            let seconds: f64 = parts.next().map_or(Some(0.0), |s| s.trim().parse().ok())?;
            Some(whole + seconds / 60.0)
        }
        other => number(Some(other)),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}

/// `/statistics` for one team and season.
pub fn team_statistics(team_id: i64, response: &Value) -> StatsResult<Value> {
    let stats = match response {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
    .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
    .ok_or_else(|| StatsUnavailable::new(format!("no statistics for team {team_id}")))?;

    let played = number(stats.pointer("/games/played/all"));
    let wins = number(stats.pointer("/games/wins/all/total"));
    let win_pct = number(stats.pointer("/games/wins/all/percentage"))
        .map(as_fraction)
        .or_else(|| match (wins, played) {
            (Some(w), Some(p)) if p > 0.0 => Some(w / p),
            _ => None,
        });

    Ok(json!({
        "team_id": team_id,
        "win_pct": win_pct,
        "avg_points": number(stats.pointer("/points/for/average/all")),
        "avg_points_allowed": number(stats.pointer("/points/against/average/all")),
    }))
}

fn game_line(game: &Value) -> Option<Value> {
    let date = parse_date(game.get("date")?.as_str()?)?;
    let home_team_id = game.pointer("/teams/home/id")?.as_i64()?;
    let away_team_id = game.pointer("/teams/away/id")?.as_i64()?;
    let status = game
        .pointer("/status/short")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(json!({
        "game_id": game.get("id").and_then(Value::as_i64),
        "date": date,
        "home_team_id": home_team_id,
        "away_team_id": away_team_id,
        "home_team": game.pointer("/teams/home/name"),
        "away_team": game.pointer("/teams/away/name"),
        "home_score": game.pointer("/scores/home/total").and_then(Value::as_i64),
        "away_score": game.pointer("/scores/away/total").and_then(Value::as_i64),
        "status": status,
        "finished": FINISHED_STATUSES.contains(&status),
    }))
}

/// `/games` and `/games/h2h` lists.
pub fn game_lines(response: &Value) -> StatsResult<Value> {
    let games = response
        .as_array()
        .ok_or_else(|| StatsUnavailable::new("game list is not an array"))?;
    let lines: Vec<Value> = games.iter().filter_map(game_line).collect();
    if lines.len() < games.len() {
        debug!(skipped = games.len() - lines.len(), "Dropped games without date or teams");
    }
    Ok(Value::Array(lines))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn column(rows: &[&Value], pointers: &[&str]) -> Vec<f64> {
    rows.iter().filter_map(|row| first_number(row, pointers)).collect()
}

fn shooting(rows: &[&Value], made: &[&str], attempts: &[&str]) -> Option<f64> {
    let made = column(rows, made);
    let attempts = column(rows, attempts);
    if made.is_empty() || attempts.is_empty() {
        return None;
    }
    let attempts: f64 = attempts.iter().sum();
    Some(if attempts > 0.0 {
        made.iter().sum::<f64>() / attempts
    } else {
        0.0
    })
}

/// `/players/statistics`: one row per game, averaged over the games played.
/// Accepts both the nested (`field_goals.total`) and flat (`fgm`) spellings.
pub fn player_averages(player_id: i64, response: &Value) -> StatsResult<Value> {
    let rows: Vec<&Value> = response
        .as_array()
        .ok_or_else(|| StatsUnavailable::new("player statistics are not a list"))?
        .iter()
        .filter(|row| {
            minutes(row.get("minutes").or_else(|| row.get("min"))).map_or(true, |m| m > 0.0)
        })
        .collect();
    if rows.is_empty() {
        return Err(StatsUnavailable::new(format!(
            "no games played by player {player_id}"
        )));
    }

    let played_minutes: Vec<f64> = rows
        .iter()
        .filter_map(|row| minutes(row.get("minutes").or_else(|| row.get("min"))))
        .collect();

    Ok(json!({
        "player_id": player_id,
        "games_played": rows.len(),
        "avg_points": mean(&column(&rows, &["/points"])),
        "avg_rebounds": mean(&column(&rows, &["/rebounds/total", "/totReb"])),
        "avg_assists": mean(&column(&rows, &["/assists"])),
        "avg_steals": mean(&column(&rows, &["/steals"])),
        "avg_blocks": mean(&column(&rows, &["/blocks"])),
        "avg_turnovers": mean(&column(&rows, &["/turnovers"])),
        "avg_fga": mean(&column(&rows, &["/field_goals/attempts", "/fga"])),
        "avg_fta": mean(&column(&rows, &["/freethrows_goals/attempts", "/fta"])),
        "fg_percentage": shooting(&rows, &["/field_goals/total", "/fgm"], &["/field_goals/attempts", "/fga"]),
        "three_pt_percentage": shooting(
            &rows,
            &["/threepoint_goals/total", "/tpm"],
            &["/threepoint_goals/attempts", "/tpa"],
        ),
        "ft_percentage": shooting(
            &rows,
            &["/freethrows_goals/total", "/ftm"],
            &["/freethrows_goals/attempts", "/fta"],
        ),
        "minutes_per_game": mean(&played_minutes),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::{parse_game_lines, HeadToHead, PlayerStats, RecentForm, TeamStats};

    fn statistics_fixture() -> Value {
        json!({
            "league": {"id": 12, "name": "NBA", "season": "2024-2025"},
            "team": {"id": 145, "name": "Boston Celtics"},
            "games": {
                "played": {"home": 21, "away": 19, "all": 40},
                "wins": {
                    "home": {"total": 15, "percentage": "0.714"},
                    "away": {"total": 14, "percentage": "0.737"},
                    "all": {"total": 29, "percentage": "0.725"}
                },
                "loses": {"all": {"total": 11, "percentage": "0.275"}}
            },
            "points": {
                "for": {"total": {"all": 4712}, "average": {"home": "118.9", "away": "116.6", "all": "117.8"}},
                "against": {"total": {"all": 4348}, "average": {"home": "107.2", "away": "110.3", "all": "108.7"}}
            }
        })
    }

    fn game_fixture(id: i64, date: &str, home: i64, away: i64, status: &str, scores: Option<(i64, i64)>) -> Value {
        json!({
            "id": id,
            "date": date,
            "status": {"long": "Game Finished", "short": status},
            "teams": {
                "home": {"id": home, "name": "Home"},
                "away": {"id": away, "name": "Away"}
            },
            "scores": {
                "home": {"quarter_1": 30, "total": scores.map(|s| s.0)},
                "away": {"quarter_1": 28, "total": scores.map(|s| s.1)}
            }
        })
    }

    #[test]
    fn test_team_statistics_from_nested_payload() {
        let payload = team_statistics(145, &statistics_fixture()).unwrap();
        let stats = TeamStats::from_value(&payload).unwrap();

        assert_eq!(stats.team_id, Some(145));
        assert_eq!(stats.win_pct, Some(0.725));
        assert_eq!(stats.avg_points, Some(117.8));
        assert_eq!(stats.avg_points_allowed, Some(108.7));
        assert_eq!(stats.offensive_rating, None);
    }

    #[test]
    fn test_team_statistics_fallbacks() {
        let mut fixture = statistics_fixture();
        fixture["games"]["wins"]["all"]["percentage"] = Value::Null;
        let stats = TeamStats::from_value(&team_statistics(145, &fixture).unwrap()).unwrap();
        assert!((stats.win_pct.unwrap() - 29.0 / 40.0).abs() < 1e-12);

        fixture["games"]["wins"]["all"]["percentage"] = json!(72.5);
        let stats = TeamStats::from_value(&team_statistics(145, &fixture).unwrap()).unwrap();
        assert!((stats.win_pct.unwrap() - 0.725).abs() < 1e-12);

        assert!(team_statistics(145, &json!([])).is_err());
        assert!(team_statistics(145, &json!({})).is_err());
    }

    #[test]
    fn test_h2h_game_list_feeds_head_to_head() {
        let response = json!([
            game_fixture(1, "2024-11-02T00:00:00+00:00", 145, 161, "FT", Some((110, 100))),
            game_fixture(2, "2024-12-05T00:30:00+00:00", 161, 145, "AOT", Some((98, 104))),
            game_fixture(3, "2025-01-03T01:00:00+00:00", 161, 145, "FT", Some((120, 101))),
            game_fixture(4, "2025-02-14T00:00:00+00:00", 145, 161, "NS", None),
            {"id": 5, "date": "2025-03-01T00:00:00+00:00", "teams": {}}
        ]);
        let lines = parse_game_lines(&game_lines(&response).unwrap()).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].finished);
        assert!(!lines[3].finished);

        let before = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        let h2h = HeadToHead::from_games(&lines, 145, 161, before);
        assert_eq!(h2h.home_wins, Some(2.0));
        assert_eq!(h2h.away_wins, Some(1.0));
        assert!((h2h.avg_point_diff.unwrap() + 1.0).abs() < 1e-12);

        let reversed = HeadToHead::from_games(&lines, 161, 145, before);
        assert_eq!(reversed.home_wins, Some(1.0));
        assert!((reversed.avg_point_diff.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_team_schedule_feeds_recent_form() {
        let response = json!([
            game_fixture(1, "2025-01-02T00:00:00+00:00", 145, 20, "FT", Some((101, 99))),
            game_fixture(2, "2025-01-04T00:00:00+00:00", 21, 145, "FT", Some((112, 100))),
            game_fixture(3, "2025-01-06T00:00:00+00:00", 145, 22, "FT", Some((120, 90))),
            game_fixture(4, "2025-01-09T00:00:00+00:00", 145, 23, "NS", None)
        ]);
        let lines = parse_game_lines(&game_lines(&response).unwrap()).unwrap();
        let form = RecentForm::from_games(&lines, 145, NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());

        assert_eq!(form.last_5_wins, 2.0);
        assert_eq!(form.days_rest, 2.0);
    }

    #[test]
    fn test_game_lines_rejects_non_list() {
        assert!(game_lines(&json!({"id": 1})).is_err());
    }

    #[test]
    fn test_player_averages_nested_rows() {
        let row = |points: i64, fgm: i64, fga: i64, mins: &str| {
            json!({
                "player": {"id": 265, "name": "J. Tatum"},
                "points": points,
                "minutes": mins,
                "field_goals": {"total": fgm, "attempts": fga, "percentage": null},
                "threepoint_goals": {"total": 3, "attempts": 8},
                "freethrows_goals": {"total": 4, "attempts": 5},
                "rebounds": {"total": 8},
                "assists": 5
            })
        };
        let response = json!([
            row(30, 11, 20, "36:00"),
            row(20, 7, 16, "33:30"),
            row(0, 0, 0, "0:00")
        ]);
        let payload = player_averages(265, &response).unwrap();
        let stats = PlayerStats::from_value(&payload).unwrap();

        assert_eq!(stats.games_played, Some(2.0));
        assert_eq!(stats.avg_points, Some(25.0));
        assert_eq!(stats.avg_fga, Some(18.0));
        assert!((stats.fg_percentage.unwrap() - 0.5).abs() < 1e-12);
        assert!((stats.three_pt_percentage.unwrap() - 0.375).abs() < 1e-12);
        assert!((stats.minutes_per_game.unwrap() - 34.75).abs() < 1e-12);
        assert_eq!(stats.avg_steals, None);
    }

    #[test]
    fn test_player_averages_flat_rows() {
        let response = json!([
            {"points": 28, "min": "35", "fgm": 10, "fga": 19, "tpm": 2, "tpa": 6,
             "ftm": 6, "fta": 7, "totReb": 9, "assists": 6, "steals": 2, "blocks": 1, "turnovers": 3}
        ]);
        let stats = PlayerStats::from_value(&player_averages(2544, &response).unwrap()).unwrap();

        assert_eq!(stats.avg_rebounds, Some(9.0));
        assert_eq!(stats.avg_steals, Some(2.0));
        assert_eq!(stats.avg_turnovers, Some(3.0));
        assert_eq!(stats.minutes_per_game, Some(35.0));
        assert!(player_averages(2544, &json!([])).is_err());
    }
}

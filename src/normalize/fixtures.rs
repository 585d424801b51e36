use serde_json::Value;
use tracing::debug;

use super::team_codes::TeamCodeCache;
use crate::models::{FixtureItem, Status, Team};

/// Normalize one fixture from the structured API.
///
/// ```text
/// { "homeTeamName": "...", "awayTeamName": "...", "status": "FINISHED",
///   "result": { "goalsHomeTeam": 2, "goalsAwayTeam": 1 } }
/// ```
///
/// Returns `None` when the status does not match `status`, when a team name
/// is missing or yields no code, or when a finished fixture lacks its goals.
pub fn normalize_fixture(
    raw: &Value,
    status: Option<Status>,
    codes: &TeamCodeCache,
    roster: &[Team],
) -> Option<FixtureItem> {
    if let Some(status) = status {
        if raw["status"].as_str() != Some(status.upstream()) {
            return None;
        }
    }

    let home_name = raw["homeTeamName"].as_str()?;
    let away_name = raw["awayTeamName"].as_str()?;
    let home_score = goals(&raw["result"]["goalsHomeTeam"]);
    let away_score = goals(&raw["result"]["goalsAwayTeam"]);

    let finished = raw["status"].as_str() == Some(Status::Finished.upstream());
    if finished && (home_score.is_none() || away_score.is_none()) {
        debug!(
            "Skipping finished fixture without result: {} vs {}",
            home_name, away_name
        );
        return None;
    }

    let home_team = codes.resolve(home_name, roster);
    let away_team = codes.resolve(away_name, roster);
    if home_team.is_empty() || away_team.is_empty() {
        debug!("Skipping fixture without usable team names: {} vs {}", home_name, away_name);
        return None;
    }

    Some(FixtureItem {
        home_team,
        away_team,
        home_score,
        away_score,
    })
}

// Goals arrive as numbers, occasionally as numeric strings
fn goals(v: &Value) -> Option<u32> {
    v.as_u64()
        .and_then(|g| u32::try_from(g).ok())
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

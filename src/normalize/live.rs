//! Scraped live-score rows.
//!
//! A row is shown when the match is running (the page adds an in-progress
//! score marker) or when the result cell carries a half-time score but no
//! final score yet (`-:-(1:0)`). Anything else is still being set up or was
//! postponed and is left out.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::team_codes::TeamCodeCache;
use crate::models::{FixtureItem, LiveRow, Team};

static HALF_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-:-\(\d+:\d+\)").expect("valid half-time pattern"));
static SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+:\d+").expect("valid score pattern"));

/// Link texts this short are icons or noise, not team names.
const MIN_TEAM_NAME_LEN: usize = 3;

pub fn normalize_row(row: &LiveRow, codes: &TeamCodeCache, roster: &[Team]) -> Option<FixtureItem> {
    let (home_score, away_score) = row_score(row)?;

    let names: Vec<String> = row
        .team_names
        .iter()
        .map(|n| ascii_only(n))
        .filter(|n| n.len() >= MIN_TEAM_NAME_LEN)
        .collect();
    let [home_name, away_name, ..] = names.as_slice() else {
        debug!("Skipping live row with {} team name(s)", names.len());
        return None;
    };

    let home_team = codes.resolve(home_name, roster);
    let away_team = codes.resolve(away_name, roster);
    if home_team.is_empty() || away_team.is_empty() {
        return None;
    }

    Some(FixtureItem {
        home_team,
        away_team,
        home_score: Some(home_score),
        away_score: Some(away_score),
    })
}

/// Score to display for a row: the live marker if present, otherwise the
/// half-time score of a match without a final result.
pub fn row_score(row: &LiveRow) -> Option<(u32, u32)> {
    if let Some(live) = row.live_score.as_deref() {
        return parse_score(&ascii_only(live));
    }
    let goals = ascii_only(&row.goals_text);
    if !HALF_TIME.is_match(&goals) {
        return None;
    }
    SCORE.find(&goals).and_then(|m| parse_score(m.as_str()))
}

fn parse_score(s: &str) -> Option<(u32, u32)> {
    let (home, away) = s.split_once(':')?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

fn ascii_only(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect::<String>().trim().to_string()
}

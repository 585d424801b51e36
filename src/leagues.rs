use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::Path;

use crate::error::FetchError;
use crate::models::{Query, Status};

/// One entry of the static league reference file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct League {
    /// Code given on the command line, e.g. "PL" or "BL1"
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Competition id on the structured API, absent for live-only leagues
    #[serde(default)]
    pub id: Option<u32>,
    /// Path fragment of the live-score page, absent when there is none
    #[serde(default)]
    pub live: Option<String>,
}

impl League {
    /// Build the query for `status`, rejecting combinations the league's
    /// sources cannot serve.
    pub fn query_for(&self, status: Status) -> Result<Query, FetchError> {
        match status {
            Status::InPlay => {
                if self.live.is_none() {
                    return Err(FetchError::Unsupported(format!(
                        "No live results for league {}",
                        self.code
                    )));
                }
                Ok(Query::LiveScores {
                    competition: self.code.clone(),
                })
            }
            Status::Finished | Status::Timed => {
                if self.id.is_none() {
                    return Err(FetchError::Unsupported(format!(
                        "League {} is live results only",
                        self.code
                    )));
                }
                Ok(Query::Fixtures {
                    competition: self.code.clone(),
                    status,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeagueRegistry {
    leagues: Vec<League>,
}

impl LeagueRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read league file {}", path.display()))?;
        let registry = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse league file {}", path.display()))?;
        if registry.is_empty() {
            anyhow::bail!("League file {} lists no leagues", path.display());
        }
        Ok(registry)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let leagues: Vec<League> = serde_json::from_str(raw)?;
        Ok(LeagueRegistry { leagues })
    }

    pub fn find(&self, code: &str) -> Result<&League, FetchError> {
        self.leagues
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| FetchError::Config(format!("league not found: {}", code)))
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }
}

/// Season label used by the live-score page, e.g. "2017-18".
/// Seasons roll over in July.
pub fn season_label(today: NaiveDate) -> String {
    let start = if today.month() >= 7 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

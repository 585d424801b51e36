use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Match status filter accepted by the football subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Status {
    #[value(name = "in_play")]
    InPlay,
    #[value(name = "finished")]
    Finished,
    #[value(name = "timed")]
    Timed,
}

impl Status {
    /// Status string as the structured API spells it ("IN_PLAY", ...).
    pub fn upstream(self) -> &'static str {
        match self {
            Status::InPlay => "IN_PLAY",
            Status::Finished => "FINISHED",
            Status::Timed => "TIMED",
        }
    }

    /// Fixture time window: past four days for results, next week otherwise.
    pub fn time_frame(self) -> &'static str {
        match self {
            Status::Finished => "p4",
            Status::InPlay | Status::Timed => "n7",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::InPlay => "in_play",
            Status::Finished => "finished",
            Status::Timed => "timed",
        })
    }
}

/// What the pipeline polls for. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Structured fixtures for a competition, filtered by status
    Fixtures { competition: String, status: Status },
    /// Scraped live scores for a competition
    LiveScores { competition: String },
    /// Current weather for a city
    Weather { city: String },
}

impl Query {
    /// Default refresh period for this domain.
    pub fn poll_interval(&self) -> Duration {
        match self {
            Query::Fixtures { .. } | Query::LiveScores { .. } => Duration::from_secs(30),
            Query::Weather { .. } => Duration::from_secs(15 * 60),
        }
    }

    pub fn is_weather(&self) -> bool {
        matches!(self, Query::Weather { .. })
    }

    /// Status filter the normalizer applies, if any.
    pub fn status_filter(&self) -> Option<Status> {
        match self {
            Query::Fixtures { status, .. } => Some(*status),
            Query::LiveScores { .. } | Query::Weather { .. } => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Fixtures {
                competition,
                status,
            } => write!(f, "fixtures {} ({})", competition, status),
            Query::LiveScores { competition } => write!(f, "live scores {}", competition),
            Query::Weather { city } => write!(f, "weather {}", city),
        }
    }
}

/// A roster entry from "list teams for competition".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

/// Text extracted from one row of the scraped live-score table.
/// Nothing here is interpreted yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveRow {
    /// Text of the result cell, e.g. "-:-(1:0)" or "2:1 (1:0)"
    pub goals_text: String,
    /// Text of the in-progress score marker when the match is running
    pub live_score: Option<String>,
    /// Link texts of the row in document order
    pub team_names: Vec<String>,
}

/// Opaque upstream payload for one item
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Fixture(serde_json::Value),
    LiveRow(LiveRow),
    Weather(serde_json::Value),
}

/// One fetch cycle's worth of raw records plus the roster used to resolve
/// scraped team names.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub records: Vec<RawRecord>,
    pub roster: Arc<[Team]>,
}

impl RawBatch {
    pub fn new(records: Vec<RawRecord>, roster: Arc<[Team]>) -> Self {
        RawBatch { records, roster }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureItem {
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl FixtureItem {
    /// "HOM21AWY" when both scores are known, "HOM-AWY" otherwise.
    pub fn label(&self) -> String {
        let score = match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => format!("{}{}", h, a),
            _ => "-".to_string(),
        };
        format!("{}{}{}", self.home_team, score, self.away_team)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherItem {
    /// Degrees Celsius, rounded to one decimal
    pub temperature: f64,
    pub description: String,
}

impl WeatherItem {
    pub fn temperature_label(&self) -> String {
        format!("{:.1}", self.temperature)
    }
}

/// One renderable unit
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Fixture(FixtureItem),
    Weather(WeatherItem),
}

/// The latest published view of the data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Snapshot {
    /// No fetch has completed yet
    #[default]
    Pending,
    /// Fetch succeeded with zero items
    Empty,
    Error(String),
    Ready(Vec<Item>),
}

impl Snapshot {
    /// Ready for a non-empty list, Empty otherwise.
    pub fn from_items(items: Vec<Item>) -> Self {
        if items.is_empty() {
            Snapshot::Empty
        } else {
            Snapshot::Ready(items)
        }
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::check_status;
use super::provider::Source;
use crate::error::FetchError;
use crate::models::{RawBatch, RawRecord, Status, Team};

const AUTH_HEADER: &str = "X-Auth-Token";

/// Client for the football-data.org v1 API.
#[derive(Clone)]
pub struct FootballDataClient {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl FootballDataClient {
    pub fn new(http: Client, api_key: &str, base_url: &str) -> Self {
        FootballDataClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Teams of a competition. Entries that do not parse are skipped.
    pub async fn teams(&self, competition_id: u32) -> Result<Vec<Team>, FetchError> {
        let url = format!("{}/v1/competitions/{}/teams", self.base_url, competition_id);
        let raw = self.get_json(&url, &[]).await?;

        let teams = raw["teams"]
            .as_array()
            .ok_or_else(|| FetchError::Payload("teams response has no 'teams' list".into()))?;
        Ok(teams
            .iter()
            .filter_map(|t| match serde_json::from_value::<Team>(t.clone()) {
                Ok(team) => Some(team),
                Err(e) => {
                    warn!("Skipping malformed team entry: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Raw fixtures of a league in the time window that fits `status`.
    pub async fn fixtures(&self, league: &str, status: Status) -> Result<Vec<Value>, FetchError> {
        let url = format!("{}/v1/fixtures", self.base_url);
        let raw = self
            .get_json(&url, &[("league", league), ("timeFrame", status.time_frame())])
            .await?;

        match raw.get("fixtures").and_then(Value::as_array) {
            Some(fixtures) => Ok(fixtures.clone()),
            None => Err(FetchError::Payload(
                "fixtures response has no 'fixtures' list".into(),
            )),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(AUTH_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| FetchError::transport("football-data request failed", e))?;
        let resp = check_status(resp, "football-data")?;
        resp.json()
            .await
            .map_err(|e| FetchError::transport("Failed to parse football-data response", e))
    }
}

/// Competition roster, fetched on first use and kept for the process
/// lifetime. A failed fetch leaves the cell empty so the next cycle retries.
pub struct Roster {
    client: FootballDataClient,
    competition_id: Option<u32>,
    cell: OnceCell<Arc<[Team]>>,
}

impl Roster {
    pub fn new(client: FootballDataClient, competition_id: Option<u32>) -> Self {
        Roster {
            client,
            competition_id,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<[Team]>, FetchError> {
        let Some(id) = self.competition_id else {
            return Ok(Arc::from(Vec::new()));
        };
        self.cell
            .get_or_try_init(|| async {
                let teams = self.client.teams(id).await?;
                info!("Loaded roster of {} teams for competition {}", teams.len(), id);
                Ok(Arc::from(teams))
            })
            .await
            .map(Arc::clone)
    }
}

/// Fixtures of one competition with one status.
pub struct FixturesSource {
    client: FootballDataClient,
    league: String,
    status: Status,
    roster: Roster,
}

impl FixturesSource {
    pub fn new(client: FootballDataClient, league: &str, competition_id: u32, status: Status) -> Self {
        FixturesSource {
            roster: Roster::new(client.clone(), Some(competition_id)),
            client,
            league: league.to_string(),
            status,
        }
    }
}

#[async_trait]
impl Source for FixturesSource {
    fn name(&self) -> &str {
        "football-data"
    }

    async fn fetch(&self) -> Result<RawBatch, FetchError> {
        let roster = self.roster.get().await?;
        let fixtures = self.client.fixtures(&self.league, self.status).await?;
        debug!("{} raw fixtures for {}", fixtures.len(), self.league);
        Ok(RawBatch::new(
            fixtures.into_iter().map(RawRecord::Fixture).collect(),
            roster,
        ))
    }
}

//! Live scores scraped from the kicker.de matchday page.
//!
//! The page lists one `tr.fest` row per match. The result cell is
//! `td.alignleft`; a running match additionally carries its current score in
//! a `span`; team names are `a.ovVrn` links. Interpreting those texts is the
//! normalizer's job, this module only pulls them out of the document.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::check_status;
use super::football_data::Roster;
use super::provider::Source;
use crate::error::FetchError;
use crate::models::{LiveRow, RawBatch, RawRecord};

static ROW: Lazy<Selector> = Lazy::new(|| selector("tr.fest"));
static GOALS: Lazy<Selector> = Lazy::new(|| selector("td.alignleft"));
static LIVE_MARKER: Lazy<Selector> = Lazy::new(|| selector("span"));
static TEAM_LINK: Lazy<Selector> = Lazy::new(|| selector("a.ovVrn"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

/// Fetches the matchday page of one league and season. No authentication.
#[derive(Clone)]
pub struct LivePageClient {
    http: Client,
    base_url: String,
}

impl LivePageClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        LivePageClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, live_path: &str, season: &str) -> String {
        format!(
            "{}/news/fussball{}/{}/spieltag.html",
            self.base_url, live_path, season
        )
    }

    pub async fn fetch_rows(&self, live_path: &str, season: &str) -> Result<Vec<LiveRow>, FetchError> {
        let url = self.page_url(live_path, season);
        debug!("Fetching live page {}", url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::transport("Live-score page request failed", e))?;
        let resp = check_status(resp, "live-score page")?;
        let html = resp
            .text()
            .await
            .map_err(|e| FetchError::transport("Failed to read live-score page", e))?;
        Ok(extract_rows(&html))
    }
}

/// Pull the raw texts of every match row out of the page.
pub fn extract_rows(html: &str) -> Vec<LiveRow> {
    let document = Html::parse_document(html);
    document.select(&ROW).map(|row| extract_row(&row)).collect()
}

fn extract_row(row: &ElementRef<'_>) -> LiveRow {
    LiveRow {
        goals_text: row.select(&GOALS).next().map(text_of).unwrap_or_default(),
        live_score: row.select(&LIVE_MARKER).next().map(text_of),
        team_names: row.select(&TEAM_LINK).map(text_of).collect(),
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Live scores of one league. Team names are matched against the
/// competition roster when the league has a structured-API id.
pub struct LiveScoresSource {
    page: LivePageClient,
    live_path: String,
    season: String,
    roster: Roster,
}

impl LiveScoresSource {
    pub fn new(page: LivePageClient, live_path: &str, season: &str, roster: Roster) -> Self {
        LiveScoresSource {
            page,
            live_path: live_path.to_string(),
            season: season.to_string(),
            roster,
        }
    }
}

#[async_trait]
impl Source for LiveScoresSource {
    fn name(&self) -> &str {
        "kicker"
    }

    async fn fetch(&self) -> Result<RawBatch, FetchError> {
        let roster = self.roster.get().await?;
        let rows = self.page.fetch_rows(&self.live_path, &self.season).await?;
        debug!("{} match rows on live page", rows.len());
        Ok(RawBatch::new(
            rows.into_iter().map(RawRecord::LiveRow).collect(),
            roster,
        ))
    }
}

pub mod football_data;
pub mod live_page;
pub mod openweather;
pub mod provider;

pub use football_data::{FixturesSource, FootballDataClient, Roster};
pub use live_page::{LivePageClient, LiveScoresSource};
pub use openweather::{OpenWeatherClient, WeatherSource};
pub use provider::Source;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// HTTP client shared by all sources. Every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("matrix-scoreboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Fail with `FetchError::Status` unless the response is a 2xx.
pub(crate) fn check_status(
    resp: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, crate::error::FetchError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(crate::error::FetchError::Status {
            context: context.to_string(),
            status: resp.status(),
        })
    }
}

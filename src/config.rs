use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::RetryPolicy;
use crate::models::Status;

/// Football scores and current weather on a small LED matrix
#[derive(Parser, Debug, Clone)]
#[command(name = "matrix-scoreboard", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Where frames are drawn
    #[arg(long, env = "DISPLAY_BACKEND", value_enum, default_value = "terminal", global = true)]
    pub display: DisplayBackend,

    /// Matrix width in pixels
    #[arg(long, env = "MATRIX_WIDTH", default_value = "32", global = true)]
    pub matrix_width: i32,

    /// Matrix height in pixels
    #[arg(long, env = "MATRIX_HEIGHT", default_value = "8", global = true)]
    pub matrix_height: i32,

    /// Refresh interval in seconds (default: 30 for football, 900 for weather)
    #[arg(long, env = "POLL_INTERVAL_SECS", global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Timeout for a single upstream request in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10", global = true)]
    pub request_timeout_secs: u64,

    /// Consecutive failed fetches tolerated before giving up (0 = stop on the first failure)
    #[arg(long, env = "MAX_RETRIES", default_value = "0", global = true)]
    pub max_retries: u32,

    /// Base delay between retries in seconds, doubled on every further failure
    #[arg(long, env = "RETRY_BACKOFF_SECS", default_value = "5", global = true)]
    pub retry_backoff_secs: u64,

    /// Similarity a scraped team name must exceed to match a roster team (0.0–1.0)
    #[arg(long, env = "FUZZY_THRESHOLD", default_value = "0.6", global = true)]
    pub fuzzy_threshold: f64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Results, upcoming fixtures or live scores for one league
    Football {
        /// League code, e.g. PL for Premier League
        league: String,

        /// Match status
        #[arg(short, long, value_enum, default_value = "in_play")]
        status: Status,

        /// football-data.org API key
        #[arg(long = "api-key", env = "APP_KEY_FOOTBALL", hide_env_values = true)]
        api_key: Option<String>,

        /// League reference file
        #[arg(long, env = "LEAGUES_FILE", default_value = "leagues.json")]
        leagues_file: PathBuf,

        /// football-data.org base URL
        #[arg(long, env = "FOOTBALL_DATA_URL", default_value = "http://api.football-data.org")]
        api_url: String,

        /// Live-score page base URL
        #[arg(long, env = "LIVE_SCORES_URL", default_value = "http://www.kicker.de")]
        live_url: String,

        /// Season of the live-score page, e.g. 2017-18 (default: current season)
        #[arg(long, env = "SEASON")]
        season: Option<String>,
    },

    /// Current temperature and conditions for a city
    Weather {
        /// City name
        #[arg(default_value = "Berlin")]
        city: String,

        /// OpenWeatherMap API key
        #[arg(long = "api-key", env = "APP_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// OpenWeatherMap base URL
        #[arg(long, env = "OPENWEATHER_URL", default_value = "https://api.openweathermap.org")]
        api_url: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayBackend {
    /// Redraw the grid in the terminal
    Terminal,
    /// Log frame contents
    Log,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::Football {
                api_key, api_url, live_url, ..
            } => {
                if api_key.is_none() {
                    anyhow::bail!("APP_KEY_FOOTBALL in .env file is required");
                }
                check_url("api_url", api_url)?;
                check_url("live_url", live_url)?;
            }
            Command::Weather {
                api_key, api_url, ..
            } => {
                if api_key.is_none() {
                    anyhow::bail!("APP_KEY in .env file is required");
                }
                check_url("api_url", api_url)?;
            }
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            anyhow::bail!("fuzzy_threshold must be between 0.0 and 1.0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.poll_interval_secs == Some(0) {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if self.matrix_width < 4 || self.matrix_height < 4 {
            anyhow::bail!("matrix must be at least 4x4 pixels");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_retries(self.max_retries, Duration::from_secs(self.retry_backoff_secs))
    }
}

fn check_url(name: &str, value: &str) -> anyhow::Result<()> {
    url::Url::parse(value).map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", name, e, value))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_football_defaults() {
        let config = parse(&["matrix-scoreboard", "football", "PL", "--api-key", "k"]);
        match &config.command {
            Command::Football { league, status, leagues_file, .. } => {
                assert_eq!(league, "PL");
                assert_eq!(*status, Status::InPlay);
                assert_eq!(leagues_file, &PathBuf::from("leagues.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy(), RetryPolicy::FailFast);
    }

    #[test]
    fn test_status_values() {
        let config = parse(&["matrix-scoreboard", "football", "BL1", "-s", "finished", "--api-key", "k"]);
        assert!(matches!(
            config.command,
            Command::Football { status: Status::Finished, .. }
        ));
        assert!(Config::try_parse_from(["matrix-scoreboard", "football", "BL1", "-s", "live"]).is_err());
    }

    #[test]
    fn test_weather_defaults_to_berlin() {
        let config = parse(&["matrix-scoreboard", "weather", "--api-key", "k"]);
        assert!(matches!(&config.command, Command::Weather { city, .. } if city == "Berlin"));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let config = parse(&["matrix-scoreboard", "--fuzzy-threshold", "1.5", "weather", "--api-key", "k"]);
        assert!(config.validate().is_err());

        let config = parse(&["matrix-scoreboard", "weather", "--api-key", "k", "--api-url", "not a url"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retries_enable_backoff() {
        let config = parse(&["matrix-scoreboard", "--max-retries", "3", "weather", "--api-key", "k"]);
        assert!(matches!(
            config.retry_policy(),
            RetryPolicy::Backoff { max_retries: 3, .. }
        ));
    }
}

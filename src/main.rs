use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

mod config;
mod error;
mod fetcher;
mod leagues;
mod models;
mod normalize;
mod render;
mod snapshot;
mod sources;

use config::{Command, Config, DisplayBackend};
use error::{FetchError, RenderError};
use fetcher::Fetcher;
use leagues::{season_label, LeagueRegistry};
use models::{Query, Snapshot};
use normalize::{Normalizer, TeamCodeCache};
use render::{Display, LogDisplay, RenderTiming, Renderer, TerminalDisplay};
use snapshot::SnapshotStore;
use sources::{
    FixturesSource, FootballDataClient, LivePageClient, LiveScoresSource, OpenWeatherClient,
    Roster, Source, WeatherSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let http = sources::http_client(config.request_timeout())?;
    let (query, source) = build_source(&config, http)?;
    let interval = config
        .poll_interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| query.poll_interval());
    info!("Showing {} (refresh every {:?})", query, interval);

    let store = SnapshotStore::new();
    let normalizer = Normalizer::new(Arc::new(TeamCodeCache::new(config.fuzzy_threshold)));
    let mut fetcher = Fetcher::new(
        query.clone(),
        source,
        normalizer,
        store.clone(),
        interval,
        config.retry_policy(),
    )
    .spawn();

    let display: Box<dyn Display> = match config.display {
        DisplayBackend::Terminal => Box::new(TerminalDisplay::new(config.matrix_width, config.matrix_height)),
        DisplayBackend::Log => Box::new(LogDisplay::new(config.matrix_width, config.matrix_height)),
    };
    let renderer = Renderer::new(RenderTiming::for_query(&query));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut render_task = tokio::spawn(renderer.run(store.clone(), display, shutdown_rx));

    let exit = tokio::select! {
        result = &mut render_task => Exit::Rendered(result),
        _ = tokio::signal::ctrl_c() => Exit::Interrupted,
        finished = fetcher.finished() => Exit::FetcherStopped(finished),
    };

    match exit {
        Exit::Rendered(result) => {
            fetcher.abort();
            render_outcome(result)
        }
        Exit::Interrupted => {
            info!("Interrupted, shutting down");
            fetcher.abort();
            let _ = shutdown_tx.send(true);
            render_outcome(render_task.await)
        }
        Exit::FetcherStopped(finished) => {
            // A fetcher that gives up has published its error already; a
            // panicked one has not
            match finished {
                Ok(reason) => info!("Fetcher stopped: {}", reason),
                Err(e) => warn!("Fetcher task ended abnormally: {}", e),
            }
            if !matches!(*store.read_current(), Snapshot::Error(_)) {
                store.publish(Snapshot::Error("Fetcher stopped".to_string()));
            }
            let result = tokio::select! {
                result = &mut render_task => result,
                _ = tokio::signal::ctrl_c() => {
                    let _ = shutdown_tx.send(true);
                    render_task.await
                }
            };
            render_outcome(result)
        }
    }
}

enum Exit {
    Rendered(Result<Result<(), RenderError>, JoinError>),
    Interrupted,
    FetcherStopped(Result<FetchError, JoinError>),
}

/// Map the render task's result onto the process exit.
fn render_outcome(result: Result<Result<(), RenderError>, JoinError>) -> Result<()> {
    match result.context("render task panicked")? {
        Ok(()) => Ok(()),
        Err(RenderError::Upstream(reason)) => {
            error!("{}", reason);
            anyhow::bail!(reason)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolve the command line into the query and the source that serves it.
///
/// An unknown league or a status the league cannot provide fails here,
/// before anything is drawn.
fn build_source(config: &Config, http: reqwest::Client) -> Result<(Query, Arc<dyn Source>)> {
    match &config.command {
        Command::Football {
            league,
            status,
            api_key,
            leagues_file,
            api_url,
            live_url,
            season,
        } => {
            let registry = LeagueRegistry::load(leagues_file)?;
            debug!("Loaded {} leagues from {}", registry.len(), leagues_file.display());
            let league = registry.find(league)?;
            let query = league.query_for(*status)?;
            let client = FootballDataClient::new(http.clone(), api_key.as_deref().unwrap_or_default(), api_url);

            let source: Arc<dyn Source> = match (&query, league.id, league.live.as_deref()) {
                (Query::LiveScores { .. }, competition_id, Some(live_path)) => {
                    let season = season
                        .clone()
                        .unwrap_or_else(|| season_label(chrono::Local::now().date_naive()));
                    info!("Live scores for {} in season {}", league.code, season);
                    Arc::new(LiveScoresSource::new(
                        LivePageClient::new(http, live_url),
                        live_path,
                        &season,
                        Roster::new(client, competition_id),
                    ))
                }
                (Query::Fixtures { .. }, Some(competition_id), _) => Arc::new(FixturesSource::new(
                    client,
                    &league.code,
                    competition_id,
                    *status,
                )),
                _ => anyhow::bail!("League {} cannot serve {}", league.code, query),
            };
            Ok((query, source))
        }
        Command::Weather {
            city,
            api_key,
            api_url,
        } => {
            let client = OpenWeatherClient::new(http, api_key.as_deref().unwrap_or_default(), api_url);
            Ok((
                Query::Weather { city: city.clone() },
                Arc::new(WeatherSource::new(client, city)),
            ))
        }
    }
}

//! Background refresh loop: fetch → normalize → publish, on a fixed period.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::FetchError;
use crate::models::{Query, Snapshot};
use crate::normalize::Normalizer;
use crate::snapshot::SnapshotStore;
use crate::sources::Source;

/// What to do after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Give up on the first failure
    FailFast,
    /// Retry up to `max_retries` consecutive failures, waiting
    /// `base * 2^(n-1)` (capped at `cap`) plus up to 50% jitter.
    Backoff {
        max_retries: u32,
        base: Duration,
        cap: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// `0` retries is fail-fast.
    pub fn from_retries(max_retries: u32, base: Duration) -> Self {
        if max_retries == 0 {
            RetryPolicy::FailFast
        } else {
            RetryPolicy::Backoff {
                max_retries,
                base,
                cap: base.saturating_mul(16),
            }
        }
    }

    /// Decide after the `failures`-th consecutive failure (1-based).
    pub fn decide(&self, failures: u32) -> RetryDecision {
        match *self {
            RetryPolicy::FailFast => RetryDecision::GiveUp,
            RetryPolicy::Backoff {
                max_retries,
                base,
                cap,
            } => {
                if failures > max_retries {
                    return RetryDecision::GiveUp;
                }
                let exp = failures.saturating_sub(1).min(16);
                let delay = base.saturating_mul(1u32 << exp).min(cap);
                let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2);
                RetryDecision::RetryAfter(delay.saturating_add(Duration::from_millis(jitter_ms)))
            }
        }
    }
}

/// Owns one source and keeps the snapshot store up to date.
pub struct Fetcher {
    query: Query,
    source: Arc<dyn Source>,
    normalizer: Normalizer,
    store: SnapshotStore,
    interval: Duration,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        query: Query,
        source: Arc<dyn Source>,
        normalizer: Normalizer,
        store: SnapshotStore,
        interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Fetcher {
            query,
            source,
            normalizer,
            store,
            interval,
            retry,
        }
    }

    /// Run on a background task.
    pub fn spawn(self) -> FetcherHandle {
        FetcherHandle {
            task: tokio::spawn(self.run()),
        }
    }

    /// Refresh forever. Returns only when the fetcher gives up, with the
    /// error that ended it; an `Error` snapshot has been published by then.
    pub async fn run(self) -> FetchError {
        info!(
            "Fetcher started ({}, source={}, interval={:?}, retry={:?})",
            self.query,
            self.source.name(),
            self.interval,
            self.retry
        );

        let mut failures = 0u32;
        loop {
            let cycle_start = Instant::now();
            debug!("Fetch cycle for {}", self.query);

            let next_wake = match self.cycle().await {
                Ok(count) => {
                    failures = 0;
                    info!("Published {} item(s) for {}", count, self.query);
                    wake_at(cycle_start, self.interval)
                }
                Err(e) if e.is_fatal() => {
                    error!("Fetcher stopping: {}", e);
                    self.store.publish(Snapshot::Error(e.to_string()));
                    return e;
                }
                Err(e) => {
                    failures += 1;
                    match self.retry.decide(failures) {
                        RetryDecision::RetryAfter(delay) => {
                            warn!(
                                "Fetch from '{}' failed ({} in a row), retrying in {:?}: {}",
                                self.source.name(),
                                failures,
                                delay,
                                e
                            );
                            wake_at(cycle_start, delay)
                        }
                        RetryDecision::GiveUp => {
                            error!(
                                "Fetch from '{}' failed {} time(s), giving up: {}",
                                self.source.name(),
                                failures,
                                e
                            );
                            self.store.publish(Snapshot::Error(e.to_string()));
                            return e;
                        }
                    }
                }
            };

            // Measured from cycle start: slow requests shorten the sleep
            tokio::time::sleep_until(next_wake).await;
        }
    }

    /// One fetch + normalize + publish. Returns the number of items published.
    async fn cycle(&self) -> Result<usize, FetchError> {
        let batch = self.source.fetch().await?;
        let items = self.normalizer.normalize(&self.query, &batch)?;
        let count = items.len();
        if count < batch.records.len() {
            debug!(
                "{} of {} record(s) dropped by normalizer",
                batch.records.len() - count,
                batch.records.len()
            );
        }
        self.store.publish(Snapshot::from_items(items));
        Ok(count)
    }
}

/// Upper bound for a wake-up that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + after`, clamped so huge intervals never overflow.
fn wake_at(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Handle to a running fetcher task.
pub struct FetcherHandle {
    task: JoinHandle<FetchError>,
}

impl FetcherHandle {
    /// Wait for the fetcher to stop and return why it stopped.
    pub async fn finished(&mut self) -> Result<FetchError, JoinError> {
        (&mut self.task).await
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, RawBatch, RawRecord, Status, Team};
    use crate::normalize::TeamCodeCache;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records when each fetch started.
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<Vec<RawRecord>, FetchError>>>,
        started: Mutex<Vec<Instant>>,
        latency: Duration,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<Vec<RawRecord>, FetchError>>, latency: Duration) -> Arc<Self> {
            Arc::new(ScriptedSource {
                results: Mutex::new(results.into()),
                started: Mutex::new(Vec::new()),
                latency,
            })
        }

        fn started(&self) -> Vec<Instant> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Source for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<RawBatch, FetchError> {
            self.started.lock().unwrap().push(Instant::now());
            tokio::time::sleep(self.latency).await;
            let next = self.results.lock().unwrap().pop_front();
            match next {
                Some(Ok(records)) => Ok(RawBatch::new(records, Arc::<[Team]>::from(Vec::new()))),
                Some(Err(e)) => Err(e),
                // Script exhausted: park until the test ends
                None => std::future::pending().await,
            }
        }
    }

    fn fixture(home: &str, away: &str, status: &str) -> RawRecord {
        RawRecord::Fixture(json!({
            "homeTeamName": home,
            "awayTeamName": away,
            "status": status,
            "result": { "goalsHomeTeam": 1, "goalsAwayTeam": 0 },
        }))
    }

    fn fetcher(source: Arc<ScriptedSource>, store: &SnapshotStore, retry: RetryPolicy) -> Fetcher {
        Fetcher::new(
            Query::Fixtures {
                competition: "PL".into(),
                status: Status::Finished,
            },
            source,
            Normalizer::new(Arc::new(TeamCodeCache::default())),
            store.clone(),
            Duration::from_secs(30),
            retry,
        )
    }

    #[test]
    fn test_fail_fast_gives_up_immediately() {
        assert_eq!(RetryPolicy::FailFast.decide(1), RetryDecision::GiveUp);
        assert_eq!(
            RetryPolicy::from_retries(0, Duration::from_secs(5)),
            RetryPolicy::FailFast
        );
    }

    #[test]
    fn test_backoff_grows_and_gives_up() {
        let policy = RetryPolicy::Backoff {
            max_retries: 3,
            base: Duration::from_secs(2),
            cap: Duration::from_secs(5),
        };
        let delay = |n| match policy.decide(n) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::GiveUp => panic!("gave up after {} failures", n),
        };
        let first = delay(1);
        assert!(first >= Duration::from_secs(2) && first <= Duration::from_secs(3));
        let second = delay(2);
        assert!(second >= Duration::from_secs(4) && second <= Duration::from_secs(6));
        // capped at 5s plus jitter
        let third = delay(3);
        assert!(third >= Duration::from_secs(5) && third <= Duration::from_millis(7_500));
        assert_eq!(policy.decide(4), RetryDecision::GiveUp);
    }

    #[test]
    fn test_huge_backoff_saturates_instead_of_panicking() {
        let policy = RetryPolicy::from_retries(1, Duration::from_secs(u64::MAX));
        assert!(matches!(policy.decide(1), RetryDecision::RetryAfter(d) if d >= Duration::from_secs(u64::MAX)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_time_is_clamped() {
        let now = Instant::now();
        assert_eq!(wake_at(now, Duration::from_secs(30)), now + Duration::from_secs(30));
        assert_eq!(wake_at(now, Duration::MAX), now + FAR_FUTURE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_items_in_upstream_order() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![
                fixture("Watford FC", "Burnley FC", "FINISHED"),
                fixture("Everton FC", "Liverpool FC", "TIMED"),
                fixture("Arsenal FC", "Chelsea FC", "FINISHED"),
            ])],
            Duration::ZERO,
        );
        let mut handle = fetcher(source, &store, RetryPolicy::FailFast).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        match &*store.read_current() {
            Snapshot::Ready(items) => {
                let labels: Vec<String> = items
                    .iter()
                    .map(|i| match i {
                        Item::Fixture(f) => f.label(),
                        Item::Weather(_) => unreachable!(),
                    })
                    .collect();
                assert_eq!(labels, vec!["WAT10BUR", "ARS10CHE"]);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
        handle.abort();
        assert!(handle.finished().await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_publishes_empty_then_recovers() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![]), Ok(vec![fixture("Arsenal FC", "Chelsea FC", "FINISHED")])],
            Duration::ZERO,
        );
        let handle = fetcher(source, &store, RetryPolicy::FailFast).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*store.read_current(), Snapshot::Empty);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(&*store.read_current(), Snapshot::Ready(items) if items.len() == 1));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_measured_from_cycle_start() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![]), Ok(vec![]), Ok(vec![])],
            Duration::from_secs(10),
        );
        let handle = fetcher(Arc::clone(&source), &store, RetryPolicy::FailFast).spawn();

        tokio::time::sleep(Duration::from_secs(65)).await;
        let started = source.started();
        assert_eq!(started.len(), 3);
        assert_eq!(started[1] - started[0], Duration::from_secs(30));
        assert_eq!(started[2] - started[1], Duration::from_secs(30));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_never_inverts_sleep() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(vec![Ok(vec![]), Ok(vec![])], Duration::from_secs(45));
        let handle = fetcher(Arc::clone(&source), &store, RetryPolicy::FailFast).spawn();

        tokio::time::sleep(Duration::from_secs(50)).await;
        let started = source.started();
        assert_eq!(started.len(), 2);
        // Second cycle starts as soon as the 45s fetch finishes
        assert_eq!(started[1] - started[0], Duration::from_secs(45));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_publishes_error_and_stops() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Err(FetchError::Upstream("city not found".into()))],
            Duration::ZERO,
        );
        let mut handle = fetcher(source, &store, RetryPolicy::FailFast).spawn();

        let reason = handle.finished().await.unwrap();
        assert_eq!(reason.to_string(), "city not found");
        assert_eq!(
            *store.read_current(),
            Snapshot::Error("city not found".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_weather_publishes_error() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Ok(vec![RawRecord::Weather(json!({ "cod": 200, "name": "Berlin" }))])],
            Duration::ZERO,
        );
        let mut handle = Fetcher::new(
            Query::Weather {
                city: "Berlin".into(),
            },
            source,
            Normalizer::new(Arc::new(TeamCodeCache::default())),
            store.clone(),
            Duration::from_secs(900),
            RetryPolicy::FailFast,
        )
        .spawn();

        let reason = handle.finished().await.unwrap();
        assert!(matches!(reason, FetchError::Payload(_)));
        assert!(matches!(&*store.read_current(), Snapshot::Error(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_ignores_retry_policy() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![Err(FetchError::Unsupported("live results only".into()))],
            Duration::ZERO,
        );
        let policy = RetryPolicy::from_retries(5, Duration::from_secs(1));
        let mut handle = fetcher(source, &store, policy).spawn();

        let reason = handle.finished().await.unwrap();
        assert!(reason.is_fatal());
        assert!(matches!(&*store.read_current(), Snapshot::Error(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_keeps_last_snapshot_while_retrying() {
        let store = SnapshotStore::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![fixture("Arsenal FC", "Chelsea FC", "FINISHED")]),
                Err(FetchError::Payload("truncated body".into())),
                Ok(vec![]),
            ],
            Duration::ZERO,
        );
        let policy = RetryPolicy::from_retries(2, Duration::from_secs(1));
        let handle = fetcher(Arc::clone(&source), &store, policy).spawn();

        // After the failure at t=30 the previous Ready stays visible
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert!(matches!(&*store.read_current(), Snapshot::Ready(_)));

        // Retry happens within base + jitter, well before the next interval
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*store.read_current(), Snapshot::Empty);
        assert_eq!(source.started().len(), 3);
        handle.abort();
    }
}

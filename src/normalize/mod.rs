pub mod fixtures;
pub mod live;
pub mod team_codes;
pub mod weather;

pub use team_codes::TeamCodeCache;

use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{Item, Query, RawBatch, RawRecord};

/// Turns raw upstream records into display items.
///
/// Output order is the order the records arrived in. Records that do not
/// match the query's status filter, or that are missing fields the domain
/// needs, are dropped.
#[derive(Clone)]
pub struct Normalizer {
    codes: Arc<TeamCodeCache>,
}

impl Normalizer {
    pub fn new(codes: Arc<TeamCodeCache>) -> Self {
        Normalizer { codes }
    }

    /// Fixtures and live rows are skipped one by one when malformed. A
    /// weather record is the whole response, so a malformed one fails the
    /// batch with [`FetchError::Payload`].
    pub fn normalize(&self, query: &Query, batch: &RawBatch) -> Result<Vec<Item>, FetchError> {
        let status = query.status_filter();
        let mut items = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            let item = match (query, record) {
                (Query::Fixtures { .. }, RawRecord::Fixture(raw)) => {
                    fixtures::normalize_fixture(raw, status, &self.codes, &batch.roster)
                        .map(Item::Fixture)
                }
                (Query::LiveScores { .. }, RawRecord::LiveRow(row)) => {
                    live::normalize_row(row, &self.codes, &batch.roster).map(Item::Fixture)
                }
                (Query::Weather { .. }, RawRecord::Weather(raw)) => {
                    let item = weather::normalize_weather(raw).ok_or_else(|| {
                        FetchError::Payload(
                            "weather response has no main.temp or weather description".into(),
                        )
                    })?;
                    Some(Item::Weather(item))
                }
                _ => {
                    debug!("Ignoring record that does not belong to {}", query);
                    None
                }
            };
            items.extend(item);
        }
        debug!(
            "Normalized {} of {} records ({} team codes cached)",
            items.len(),
            batch.records.len(),
            self.codes.len()
        );
        Ok(items)
    }
}

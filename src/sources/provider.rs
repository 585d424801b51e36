use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::RawBatch;

/// Trait that every upstream data source must implement.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch one batch of raw records for the configured query.
    async fn fetch(&self) -> Result<RawBatch, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

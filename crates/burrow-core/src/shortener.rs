use crate::repository::OwnedUrl;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// One item of a batch creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Caller-chosen id echoed back in the matching [`BatchResult`].
    pub correlation_id: String,
    pub original_url: String,
}

/// One item of a batch creation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}

/// Aggregate counters reported by [`Shortener::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub urls: u64,
    pub users: u64,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a single URL on behalf of `owner_id` and returns the short URL.
    ///
    /// If the URL was already shortened, returns
    /// [`ShortenerError::Duplicate`](crate::ShortenerError::Duplicate)
    /// carrying the existing short URL.
    async fn create_one(&self, original_url: &str, owner_id: &str) -> Result<String>;

    /// Shortens every item in order. The first storage failure aborts the
    /// whole batch; duplicates count as successes.
    async fn create_batch(&self, owner_id: &str, items: Vec<BatchItem>)
        -> Result<Vec<BatchResult>>;

    /// Resolves a short code to its original URL.
    async fn get_original(&self, code: &ShortCode) -> Result<String>;

    /// Lists the URLs created by `owner_id`.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>>;

    /// Schedules the given codes for soft deletion and returns immediately.
    ///
    /// The outcome is never reported back to the caller.
    fn delete_batch(&self, owner_id: &str, codes: Vec<ShortCode>);

    /// Counts stored URLs and distinct owners.
    async fn stats(&self) -> Result<Stats>;

    /// Checks that the underlying store is reachable.
    async fn ping(&self) -> Result<()>;
}

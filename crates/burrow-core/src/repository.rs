use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored URL record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Opaque row handle, never exposed to callers of the transports.
    pub id: String,
    /// Base URL joined with the generated short code.
    pub short_url: String,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Identity of the caller that created the record.
    pub owner_id: String,
    /// Soft-delete flag. Only ever flips from `false` to `true`.
    pub deleted: bool,
}

/// The result of [`Repository::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub original_url: String,
    pub deleted: bool,
}

/// One entry of [`Repository::list_by_owner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUrl {
    pub short_url: String,
    pub original_url: String,
}

/// Outcome of a [`Repository::save`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was inserted; carries its short URL.
    Created(String),
    /// A record with the same original URL already existed; carries that
    /// record's short URL. Nothing was inserted.
    Duplicate(String),
}

impl SaveOutcome {
    /// The short URL the original URL is reachable under, whichever way the
    /// save went.
    pub fn short_url(&self) -> &str {
        match self {
            SaveOutcome::Created(url) | SaveOutcome::Duplicate(url) => url,
        }
    }

    pub fn into_short_url(self) -> String {
        match self {
            SaveOutcome::Created(url) | SaveOutcome::Duplicate(url) => url,
        }
    }
}

/// Persistent store of URL records.
///
/// Every implementation enforces the dedup invariant: at most one record
/// exists per distinct `original_url`, and the check-then-insert in
/// [`Repository::save`] is atomic with respect to concurrent saves.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a record unless its original URL is already stored.
    async fn save(&self, record: UrlRecord) -> Result<SaveOutcome>;

    /// Looks up a record by its full short URL.
    /// Returns `None` if no record matches.
    async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedUrl>>;

    /// Lists every record created by `owner_id`, deleted ones included.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>>;

    /// Sets the deleted flag on the record matching both `short_url` and
    /// `owner_id`. Unknown codes, foreign owners and already deleted records
    /// are silent no-ops.
    async fn mark_deleted(&self, short_url: &str, owner_id: &str) -> Result<()>;

    /// Number of stored records, deleted ones included.
    async fn count_records(&self) -> Result<u64>;

    /// Number of distinct owners across all records.
    async fn count_distinct_owners(&self) -> Result<u64>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for std::sync::Arc<R> {
    async fn save(&self, record: UrlRecord) -> Result<SaveOutcome> {
        (**self).save(record).await
    }

    async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedUrl>> {
        (**self).resolve(short_url).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        (**self).list_by_owner(owner_id).await
    }

    async fn mark_deleted(&self, short_url: &str, owner_id: &str) -> Result<()> {
        (**self).mark_deleted(short_url, owner_id).await
    }

    async fn count_records(&self) -> Result<u64> {
        (**self).count_records().await
    }

    async fn count_distinct_owners(&self) -> Result<u64> {
        (**self).count_distinct_owners().await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

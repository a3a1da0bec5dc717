use async_trait::async_trait;
use burrow_core::error::{Result, StorageError};
use burrow_core::repository::{OwnedUrl, Repository, ResolvedUrl, SaveOutcome, UrlRecord};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// In-memory storage entry for a URL mapping.
#[derive(Debug, Clone)]
struct StoredUrl {
    original_url: String,
    owner_id: String,
    deleted: bool,
}

/// In-memory implementation of the Repository trait using DashMap.
///
/// The dedup check holds the shard lock of the `by_original` index entry
/// while the record is inserted, so concurrent saves of the same original
/// URL cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: DashMap<String, StoredUrl>,
    by_original: DashMap<String, String>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            by_original: DashMap::with_capacity(capacity),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save(&self, record: UrlRecord) -> Result<SaveOutcome> {
        match self.by_original.entry(record.original_url.clone()) {
            Entry::Occupied(existing) => Ok(SaveOutcome::Duplicate(existing.get().clone())),
            Entry::Vacant(slot) => {
                if self.records.contains_key(&record.short_url) {
                    return Err(StorageError::Operation(format!(
                        "short url already taken: {}",
                        record.short_url
                    )));
                }

                self.records.insert(
                    record.short_url.clone(),
                    StoredUrl {
                        original_url: record.original_url,
                        owner_id: record.owner_id,
                        deleted: record.deleted,
                    },
                );
                slot.insert(record.short_url.clone());
                Ok(SaveOutcome::Created(record.short_url))
            }
        }
    }

    async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedUrl>> {
        Ok(self.records.get(short_url).map(|entry| ResolvedUrl {
            original_url: entry.original_url.clone(),
            deleted: entry.deleted,
        }))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| OwnedUrl {
                short_url: entry.key().clone(),
                original_url: entry.original_url.clone(),
            })
            .collect())
    }

    async fn mark_deleted(&self, short_url: &str, owner_id: &str) -> Result<()> {
        if let Some(mut entry) = self.records.get_mut(short_url) {
            if entry.owner_id == owner_id {
                entry.deleted = true;
            }
        }
        Ok(())
    }

    async fn count_records(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }

    async fn count_distinct_owners(&self) -> Result<u64> {
        let owners: HashSet<String> = self
            .records
            .iter()
            .map(|entry| entry.owner_id.clone())
            .collect();
        Ok(owners.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

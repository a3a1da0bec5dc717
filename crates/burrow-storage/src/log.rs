use async_trait::async_trait;
use burrow_core::error::{Result, StorageError};
use burrow_core::repository::{OwnedUrl, Repository, ResolvedUrl, SaveOutcome, UrlRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// One line of the log. Older logs used `uuid` and `user_uuid`.
#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    #[serde(alias = "uuid")]
    id: String,
    short_url: String,
    original_url: String,
    #[serde(alias = "user_uuid", default)]
    owner_id: String,
    #[serde(default)]
    deleted: bool,
}

impl From<UrlRecord> for LogLine {
    fn from(record: UrlRecord) -> Self {
        Self {
            id: record.id,
            short_url: record.short_url,
            original_url: record.original_url,
            owner_id: record.owner_id,
            deleted: record.deleted,
        }
    }
}

impl From<LogLine> for UrlRecord {
    fn from(line: LogLine) -> Self {
        Self {
            id: line.id,
            short_url: line.short_url,
            original_url: line.original_url,
            owner_id: line.owner_id,
            deleted: line.deleted,
        }
    }
}

/// Append-only JSON-lines file store.
///
/// Writers (`save`, `mark_deleted`) are serialized by an async mutex held for
/// the whole read-check-write sequence. Readers take no lock: rewrites land
/// through a rename, and an unterminated trailing line left by an append in
/// flight is ignored.
#[derive(Debug)]
pub struct LogRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LogRepository {
    /// Creates a store backed by the file at `path`. The file is created on
    /// the first insert.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self) -> Result<Vec<UrlRecord>> {
        decode(&self.read().await?)
    }

    /// Appends `record` after `current`, the log as read under the write lock.
    ///
    /// An unterminated tail in `current` is left over from an interrupted
    /// write: it is terminated if it decodes, otherwise cut off, so the new
    /// line never merges with it.
    async fn append(&self, current: &str, record: UrlRecord) -> Result<()> {
        let mut line = String::new();
        if let Some(tail) = torn_tail(current) {
            if serde_json::from_str::<LogLine>(tail.trim()).is_ok() {
                line.push('\n');
            } else {
                let keep = current.len() - tail.len();
                warn!(
                    path = %self.path.display(),
                    dropped_bytes = tail.len(),
                    "cutting off unterminated log tail"
                );
                let file = OpenOptions::new().write(true).open(&self.path).await?;
                file.set_len(keep as u64).await?;
            }
        }
        line.push_str(&encode(record)?);
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn rewrite(&self, records: Vec<UrlRecord>) -> Result<()> {
        let mut content = String::new();
        for record in records {
            content.push_str(&encode(record)?);
            content.push('\n');
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

fn encode(record: UrlRecord) -> Result<String> {
    serde_json::to_string(&LogLine::from(record))
        .map_err(|e| StorageError::InvalidData(format!("encode log line: {e}")))
}

fn torn_tail(content: &str) -> Option<&str> {
    if content.is_empty() || content.ends_with('\n') {
        return None;
    }
    Some(content.rsplit_once('\n').map_or(content, |(_, tail)| tail))
}

fn decode(content: &str) -> Result<Vec<UrlRecord>> {
    let terminated = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let last = lines.len().saturating_sub(1);

    let mut records = Vec::with_capacity(lines.len());
    for (index, raw) in lines.iter().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        match serde_json::from_str::<LogLine>(raw) {
            Ok(line) => records.push(line.into()),
            // partial append still being written
            Err(_) if index == last && !terminated => break,
            Err(e) => {
                return Err(StorageError::InvalidData(format!(
                    "log line {}: {e}",
                    index + 1
                )))
            }
        }
    }

    Ok(records)
}

#[async_trait]
impl Repository for LogRepository {
    async fn save(&self, record: UrlRecord) -> Result<SaveOutcome> {
        let _guard = self.write_lock.lock().await;

        let current = self.read().await?;
        let existing = decode(&current)?;
        if let Some(found) = existing
            .iter()
            .find(|r| r.original_url == record.original_url)
        {
            return Ok(SaveOutcome::Duplicate(found.short_url.clone()));
        }
        if existing.iter().any(|r| r.short_url == record.short_url) {
            return Err(StorageError::Operation(format!(
                "short url already taken: {}",
                record.short_url
            )));
        }

        let short_url = record.short_url.clone();
        self.append(&current, record).await?;
        Ok(SaveOutcome::Created(short_url))
    }

    async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedUrl>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.short_url == short_url)
            .map(|r| ResolvedUrl {
                original_url: r.original_url,
                deleted: r.deleted,
            }))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| OwnedUrl {
                short_url: r.short_url,
                original_url: r.original_url,
            })
            .collect())
    }

    async fn mark_deleted(&self, short_url: &str, owner_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        let mut changed = false;
        for record in records
            .iter_mut()
            .filter(|r| r.short_url == short_url && r.owner_id == owner_id && !r.deleted)
        {
            record.deleted = true;
            changed = true;
        }

        if !changed {
            return Ok(());
        }

        tracing::debug!(short_url, owner_id, "rewriting log after soft delete");
        self.rewrite(records).await
    }

    async fn count_records(&self) -> Result<u64> {
        Ok(self.load().await?.len() as u64)
    }

    async fn count_distinct_owners(&self) -> Result<u64> {
        let records = self.load().await?;
        let owners: HashSet<&str> = records.iter().map(|r| r.owner_id.as_str()).collect();
        Ok(owners.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        match fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let parent = match self.path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                let meta = fs::metadata(parent).await.map_err(|e| {
                    StorageError::Unavailable(format!("{}: {e}", parent.display()))
                })?;
                if meta.is_dir() {
                    Ok(())
                } else {
                    Err(StorageError::Unavailable(format!(
                        "{} is not a directory",
                        parent.display()
                    )))
                }
            }
            Err(err) => Err(StorageError::Unavailable(err.to_string())),
        }
    }
}

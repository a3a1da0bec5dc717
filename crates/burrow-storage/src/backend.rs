use crate::{InMemoryRepository, LogRepository, PostgresRepository};
use burrow_core::error::Result;
use burrow_core::Repository;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Which record store a process runs on. Chosen once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Log { path: PathBuf },
    Postgres { database_url: String },
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::InMemory => write!(f, "in-memory"),
            Backend::Log { path } => write!(f, "log ({})", path.display()),
            // the DSN may carry credentials
            Backend::Postgres { .. } => write!(f, "postgres"),
        }
    }
}

impl Backend {
    /// Builds the selected store. Postgres connects and migrates eagerly.
    pub async fn open(self) -> Result<Arc<dyn Repository>> {
        info!(backend = %self, "opening record store");

        let repository: Arc<dyn Repository> = match self {
            Backend::InMemory => Arc::new(InMemoryRepository::new()),
            Backend::Log { path } => Arc::new(LogRepository::new(path)),
            Backend::Postgres { database_url } => {
                Arc::new(PostgresRepository::connect(&database_url).await?)
            }
        };

        repository.ping().await?;
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::UrlRecord;

    #[tokio::test]
    async fn opens_log_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.log");
        let repo = Backend::Log { path: path.clone() }.open().await.unwrap();

        repo.save(UrlRecord {
            id: "1".to_string(),
            short_url: "http://localhost:8080/abc".to_string(),
            original_url: "https://example.com".to_string(),
            owner_id: "u1".to_string(),
            deleted: false,
        })
        .await
        .unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn log_backend_in_missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::Log {
            path: dir.path().join("nope").join("urls.log"),
        };

        assert!(backend.open().await.is_err());
    }

    #[test]
    fn display_hides_database_url() {
        let backend = Backend::Postgres {
            database_url: "postgres://user:secret@db/burrow".to_string(),
        };
        assert_eq!(backend.to_string(), "postgres");
    }
}

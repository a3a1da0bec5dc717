use async_trait::async_trait;
use burrow_core::error::{Result, StorageError};
use burrow_core::repository::{OwnedUrl, Repository, ResolvedUrl, SaveOutcome, UrlRecord};
use sqlx::{PgPool, Row};

const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

/// Postgres implementation of the repository contract.
///
/// Dedup relies on the unique index over `original_url`: inserts use
/// `ON CONFLICT (original_url) DO NOTHING`, and a skipped insert is followed
/// by a lookup of the short URL already stored for that original URL.
/// Deletion is soft; rows are never removed.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing Postgres connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a new connection pool and makes sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    /// Creates the `urls` table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn count_to_u64(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative row count: {value}")))
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn save(&self, record: UrlRecord) -> Result<SaveOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (id, short_url, original_url, owner_id, deleted)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (original_url) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.short_url)
        .bind(&record.original_url)
        .bind(&record.owner_id)
        .bind(record.deleted)
        .execute(&self.pool)
        .await;

        let inserted = match result {
            Ok(done) => done.rows_affected() > 0,
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Operation(format!(
                    "short url already taken: {}",
                    record.short_url
                )))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        if inserted {
            return Ok(SaveOutcome::Created(record.short_url));
        }

        let existing: Option<String> =
            sqlx::query_scalar("SELECT short_url FROM urls WHERE original_url = $1")
                .bind(&record.original_url)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        existing.map(SaveOutcome::Duplicate).ok_or_else(|| {
            StorageError::InvalidData(format!(
                "insert skipped but no row holds {}",
                record.original_url
            ))
        })
    }

    async fn resolve(&self, short_url: &str) -> Result<Option<ResolvedUrl>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, deleted
            FROM urls
            WHERE short_url = $1
            LIMIT 1
            "#,
        )
        .bind(short_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ResolvedUrl {
            original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
            deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
        }))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT short_url, original_url
            FROM urls
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(OwnedUrl {
                    short_url: row.try_get("short_url").map_err(map_sqlx_error)?,
                    original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
                })
            })
            .collect()
    }

    async fn mark_deleted(&self, short_url: &str, owner_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE urls
            SET deleted = TRUE
            WHERE short_url = $1
              AND owner_id = $2
            "#,
        )
        .bind(short_url)
        .bind(owner_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn count_records(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        count_to_u64(count)
    }

    async fn count_distinct_owners(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT owner_id) FROM urls")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        count_to_u64(count)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_availability_kinds() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::Protocol("bad frame".into())),
            StorageError::Query(_)
        ));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert_eq!(count_to_u64(3).unwrap(), 3);
        assert!(matches!(count_to_u64(-1), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn schema_declares_dedup_index() {
        assert!(SCHEMA.contains("CREATE UNIQUE INDEX IF NOT EXISTS urls_original_url_idx"));
    }
}

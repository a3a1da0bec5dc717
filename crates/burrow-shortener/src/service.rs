use crate::deletion::{self, DeletionReport};
use async_trait::async_trait;
use burrow_core::{
    BatchItem, BatchResult, OwnedUrl, Repository, SaveOutcome, ShortCode, Shortener,
    ShortenerError, Stats, UrlRecord,
};
use burrow_generator::Generator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, ShortenerError>;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - Short code generation and short URL construction
/// - URL validation
/// - Scheduling of batch soft deletions
///
/// Note: The `Generator` implementation is responsible for making collisions
/// negligible. No collision retry is performed.
pub struct ShortenerService<G> {
    repository: Arc<dyn Repository>,
    generator: Arc<G>,
    base_url: String,
    shutdown: CancellationToken,
}

impl<G> Clone for ShortenerService<G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            base_url: self.base_url.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<G: Generator> ShortenerService<G> {
    /// Creates a service that publishes short URLs under `base_url`.
    pub fn new(repository: Arc<dyn Repository>, generator: G, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            repository,
            generator: Arc::new(generator),
            base_url,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Schedules a deletion batch and returns a handle to its report.
    ///
    /// The batch runs under a child of the service's shutdown token.
    pub fn spawn_deletion(&self, owner_id: &str, codes: Vec<ShortCode>) -> JoinHandle<DeletionReport> {
        let short_urls = codes.iter().map(|code| self.short_url(code)).collect();
        deletion::spawn(
            Arc::clone(&self.repository),
            owner_id.to_string(),
            short_urls,
            self.shutdown.child_token(),
        )
    }

    /// Cancels every in-flight deletion batch. Batches scheduled afterwards
    /// stop before doing any work.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Validates that the URL has a valid format (has a scheme and host).
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        };

        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                scheme
            )));
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || url.chars().any(char::is_whitespace) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        }

        // the URL becomes a Location header on redirect
        if url.chars().any(char::is_control) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must not contain control characters: {:?}",
                url
            )));
        }

        Ok(())
    }

    fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }

    async fn save_new(&self, original_url: &str, owner_id: &str) -> Result<SaveOutcome> {
        Self::validate_url(original_url)?;

        let code: ShortCode = self.generator.generate().into();
        let record = UrlRecord {
            id: burrow_generator::record_id(),
            short_url: self.short_url(&code),
            original_url: original_url.to_string(),
            owner_id: owner_id.to_string(),
            deleted: false,
        };

        Ok(self.repository.save(record).await?)
    }
}

#[async_trait]
impl<G: Generator> Shortener for ShortenerService<G> {
    async fn create_one(&self, original_url: &str, owner_id: &str) -> Result<String> {
        match self.save_new(original_url, owner_id).await? {
            SaveOutcome::Created(short_url) => {
                debug!(short_url = %short_url, owner_id, "created short url");
                Ok(short_url)
            }
            SaveOutcome::Duplicate(existing) => Err(ShortenerError::Duplicate(existing)),
        }
    }

    async fn create_batch(&self, owner_id: &str, items: Vec<BatchItem>) -> Result<Vec<BatchResult>> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let outcome = self.save_new(&item.original_url, owner_id).await?;
            results.push(BatchResult {
                correlation_id: item.correlation_id,
                short_url: outcome.into_short_url(),
            });
        }

        debug!(owner_id, count = results.len(), "created short url batch");
        Ok(results)
    }

    async fn get_original(&self, code: &ShortCode) -> Result<String> {
        let short_url = self.short_url(code);
        trace!(short_url = %short_url, "resolving short url");

        match self.repository.resolve(&short_url).await? {
            Some(resolved) if resolved.deleted => Err(ShortenerError::Gone {
                original_url: resolved.original_url,
            }),
            Some(resolved) => Ok(resolved.original_url),
            None => {
                trace!(short_url = %short_url, "short url not found");
                Err(ShortenerError::NotFound(short_url))
            }
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        Ok(self.repository.list_by_owner(owner_id).await?)
    }

    fn delete_batch(&self, owner_id: &str, codes: Vec<ShortCode>) {
        // detached; the report is only logged
        drop(self.spawn_deletion(owner_id, codes));
    }

    async fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            urls: self.repository.count_records().await?,
            users: self.repository.count_distinct_owners().await?,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(self.repository.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::base58::ShortCodeBase58;
    use burrow_generator::RandomGenerator;
    use burrow_storage::{InMemoryRepository, LogRepository};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Encodes a counter as the code bytes: `11111111`, `11111112`, ...
    /// so tests can predict short URLs.
    #[derive(Debug, Default)]
    struct SeqGenerator {
        counter: AtomicU64,
    }

    impl Generator for SeqGenerator {
        type Output = ShortCode;

        fn generate(&self) -> ShortCode {
            let count = self.counter.fetch_add(1, Ordering::SeqCst);
            ShortCodeBase58::new(count.to_be_bytes()).into()
        }
    }

    const BASE: &str = "http://localhost:8080";

    fn test_service() -> (Arc<InMemoryRepository>, ShortenerService<SeqGenerator>) {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ShortenerService::new(repo.clone(), SeqGenerator::default(), BASE);
        (repo, service)
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::parse(s).unwrap()
    }

    fn item(correlation_id: &str, url: &str) -> BatchItem {
        BatchItem {
            correlation_id: correlation_id.to_string(),
            original_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn create_one_builds_short_url_from_base() {
        let (_repo, service) = test_service();

        let short_url = service.create_one("https://example.com", "u1").await.unwrap();
        assert_eq!(short_url, "http://localhost:8080/11111111");
    }

    #[tokio::test]
    async fn create_one_twice_reports_existing_short_url() {
        let (repo, service) = test_service();

        let first = service.create_one("https://example.com", "u1").await.unwrap();
        let err = service
            .create_one("https://example.com", "u2")
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::Duplicate(ref existing) if *existing == first));
        assert_eq!(repo.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_one_rejects_invalid_urls() {
        let (_repo, service) = test_service();

        for url in ["", "not-a-valid-url", "ftp://example.com", "https://", "https:///path"] {
            let err = service.create_one(url, "u1").await.unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidUrl(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn create_rejects_control_characters() {
        let (repo, service) = test_service();

        for url in ["https://example.com/\u{1}", "https://example.com/a\u{7f}b"] {
            let err = service.create_one(url, "u1").await.unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidUrl(_)), "{url:?}");
        }
        let err = service
            .create_batch("u1", vec![item("x", "https://example.com/\u{1b}")])
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::InvalidUrl(_)));
        assert_eq!(repo.count_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn round_trip_until_deleted() {
        let (_repo, service) = test_service();
        service.create_one("https://example.com/a?b=c", "u1").await.unwrap();

        let original = service.get_original(&code("11111111")).await.unwrap();
        assert_eq!(original, "https://example.com/a?b=c");

        let report = service
            .spawn_deletion("u1", vec![code("11111111")])
            .await
            .unwrap();
        assert_eq!(report.attempted, 1);

        let err = service.get_original(&code("11111111")).await.unwrap_err();
        assert!(matches!(
            err,
            ShortenerError::Gone { ref original_url } if original_url == "https://example.com/a?b=c"
        ));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let (_repo, service) = test_service();

        let err = service.get_original(&code("nothing")).await.unwrap_err();
        assert!(matches!(err, ShortenerError::NotFound(ref url) if url == "http://localhost:8080/nothing"));
    }

    #[tokio::test]
    async fn deletion_by_other_owner_has_no_effect() {
        let (_repo, service) = test_service();
        service.create_one("https://example.com", "u1").await.unwrap();

        service
            .spawn_deletion("u2", vec![code("11111111")])
            .await
            .unwrap();

        let original = service.get_original(&code("11111111")).await.unwrap();
        assert_eq!(original, "https://example.com");
    }

    #[tokio::test]
    async fn batch_preserves_order_and_correlation_ids() {
        let (_repo, service) = test_service();

        let results = service
            .create_batch(
                "u1",
                vec![
                    item("x", "https://one.example"),
                    item("y", "https://two.example"),
                    item("z", "https://three.example"),
                ],
            )
            .await
            .unwrap();

        let pairs: Vec<(&str, &str)> = results
            .iter()
            .map(|r| (r.correlation_id.as_str(), r.short_url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("x", "http://localhost:8080/11111111"),
                ("y", "http://localhost:8080/11111112"),
                ("z", "http://localhost:8080/11111113"),
            ]
        );
    }

    #[tokio::test]
    async fn batch_duplicate_returns_stored_short_url() {
        let (_repo, service) = test_service();
        let existing = service.create_one("https://example.com", "u1").await.unwrap();

        let results = service
            .create_batch(
                "u1",
                vec![item("1", "https://example.com"), item("2", "https://new.example")],
            )
            .await
            .unwrap();

        assert_eq!(results[0].short_url, existing);
        let code_of_first = results[0].short_url.rsplit('/').next().unwrap();
        assert_eq!(
            service.get_original(&code(code_of_first)).await.unwrap(),
            "https://example.com"
        );
        assert_eq!(results[1].short_url, "http://localhost:8080/11111113");
    }

    #[tokio::test]
    async fn batch_rejects_empty_and_invalid_input() {
        let (repo, service) = test_service();

        let err = service.create_batch("u1", vec![]).await.unwrap_err();
        assert!(matches!(err, ShortenerError::EmptyBatch));

        let err = service
            .create_batch(
                "u1",
                vec![item("1", "https://ok.example"), item("2", "nope")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::InvalidUrl(_)));
        // items before the failing one stay stored
        assert_eq!(repo.count_records().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_deletion_convergence() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = ShortenerService::new(repo.clone(), SeqGenerator::default(), "");
        let codes = ["a", "b", "c", "d", "e", "f"];
        for c in codes {
            repo.save(UrlRecord {
                id: format!("id-{c}"),
                short_url: format!("/{c}"),
                original_url: format!("https://example.com/{c}"),
                owner_id: "u1".to_string(),
                deleted: false,
            })
            .await
            .unwrap();
        }

        let report = service
            .spawn_deletion("u1", codes.iter().map(|c| code(c)).collect())
            .await
            .unwrap();

        assert_eq!(report.attempted, 6);
        assert_eq!(report.failed, 0);
        for c in codes {
            let resolved = repo.resolve(&format!("/{c}")).await.unwrap().unwrap();
            assert!(resolved.deleted);
        }
    }

    #[tokio::test]
    async fn delete_batch_returns_before_deletion_lands() {
        let (_repo, service) = test_service();
        service.create_one("https://example.com", "u1").await.unwrap();

        service.delete_batch("u1", vec![code("11111111")]);

        let mut gone = false;
        for _ in 0..100 {
            if matches!(
                service.get_original(&code("11111111")).await,
                Err(ShortenerError::Gone { .. })
            ) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gone);
    }

    #[tokio::test]
    async fn shutdown_cancels_later_batches() {
        let (_repo, service) = test_service();
        service.create_one("https://example.com", "u1").await.unwrap();

        service.shutdown();
        let report = service
            .spawn_deletion("u1", vec![code("11111111")])
            .await
            .unwrap();

        assert_eq!(report.attempted, 0);
        assert!(service.get_original(&code("11111111")).await.is_ok());
    }

    #[tokio::test]
    async fn stats_and_listing() {
        let (_repo, service) = test_service();
        service.create_one("https://one.example", "u1").await.unwrap();
        service.create_one("https://two.example", "u1").await.unwrap();
        service.create_one("https://three.example", "u2").await.unwrap();

        assert_eq!(service.stats().await.unwrap(), Stats { urls: 3, users: 2 });
        assert_eq!(service.list_by_owner("u1").await.unwrap().len(), 2);
        assert!(service.list_by_owner("u3").await.unwrap().is_empty());
        service.ping().await.unwrap();
    }

    #[tokio::test]
    async fn works_over_the_log_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(LogRepository::new(dir.path().join("urls.log")));
        let service = ShortenerService::new(repo, RandomGenerator::new(), BASE);

        let short_url = service.create_one("https://example.com", "u1").await.unwrap();
        let err = service
            .create_one("https://example.com", "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::Duplicate(ref existing) if *existing == short_url));

        let generated = short_url.trim_start_matches("http://localhost:8080/");
        let report = service
            .spawn_deletion("u1", vec![ShortCode::parse(generated).unwrap()])
            .await
            .unwrap();
        assert_eq!(report.failed, 0);

        let err = service
            .get_original(&ShortCode::parse(generated).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::Gone { .. }));
    }
}

use crate::error::GrpcError;
use burrow_core::{BatchItem, ShortCode, Shortener, TrustedSubnet};
use burrow_proto_schema::v1 as proto;
use burrow_proto_schema::v1::shortener_service_server::ShortenerService;
use std::net::IpAddr;
use std::sync::Arc;
use tonic::metadata::MetadataValue;
use tonic::{Request, Response, Status};
use tracing::warn;

/// Metadata key carrying the caller identity.
pub const USER_ID_KEY: &str = "x-user-id";
/// Metadata key carrying the client address set by a front proxy.
pub const REAL_IP_KEY: &str = "x-real-ip";

pub struct ShortenerGrpcServer<S: Shortener> {
    shortener: Arc<S>,
    trusted_subnet: Option<TrustedSubnet>,
}

impl<S: Shortener> ShortenerGrpcServer<S> {
    pub fn new(shortener: Arc<S>, trusted_subnet: Option<TrustedSubnet>) -> Self {
        Self {
            shortener,
            trusted_subnet,
        }
    }
}

fn caller<T>(request: &Request<T>) -> Option<String> {
    request
        .metadata()
        .get(USER_ID_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Returns the caller identity, or a fresh one flagged as newly assigned.
fn caller_or_assign<T>(request: &Request<T>) -> (String, bool) {
    match caller(request) {
        Some(owner_id) => (owner_id, false),
        None => (burrow_generator::owner_id(), true),
    }
}

fn client_ip<T>(request: &Request<T>) -> Option<IpAddr> {
    request
        .metadata()
        .get(REAL_IP_KEY)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .or_else(|| request.remote_addr().map(|addr| addr.ip()))
}

fn respond<T>(message: T, owner_id: &str, assigned: bool) -> Result<Response<T>, Status> {
    let mut response = Response::new(message);
    if assigned {
        let value = MetadataValue::try_from(owner_id)
            .map_err(|_| Status::internal("assigned identity is not valid metadata"))?;
        response.metadata_mut().insert(USER_ID_KEY, value);
    }
    Ok(response)
}

#[tonic::async_trait]
impl<S: Shortener> ShortenerService for ShortenerGrpcServer<S> {
    async fn create_url(
        &self,
        request: Request<proto::CreateUrlRequest>,
    ) -> Result<Response<proto::CreateUrlResponse>, Status> {
        let (owner_id, assigned) = caller_or_assign(&request);
        let original_url = request.into_inner().original_url;

        let short_url = self
            .shortener
            .create_one(original_url.trim(), &owner_id)
            .await
            .map_err(GrpcError::from)?;

        respond(proto::CreateUrlResponse { short_url }, &owner_id, assigned)
    }

    async fn batch_shorten(
        &self,
        request: Request<proto::BatchShortenRequest>,
    ) -> Result<Response<proto::BatchShortenResponse>, Status> {
        let (owner_id, assigned) = caller_or_assign(&request);
        let items: Vec<BatchItem> = request
            .into_inner()
            .items
            .into_iter()
            .map(BatchItem::from)
            .collect();

        let results = self
            .shortener
            .create_batch(&owner_id, items)
            .await
            .map_err(GrpcError::from)?;

        respond(
            proto::BatchShortenResponse {
                results: results.into_iter().map(Into::into).collect(),
            },
            &owner_id,
            assigned,
        )
    }

    async fn get_original_url(
        &self,
        request: Request<proto::GetOriginalUrlRequest>,
    ) -> Result<Response<proto::GetOriginalUrlResponse>, Status> {
        let code = ShortCode::try_from(request.get_ref()).map_err(GrpcError::from)?;

        let original_url = self
            .shortener
            .get_original(&code)
            .await
            .map_err(GrpcError::from)?;

        Ok(Response::new(proto::GetOriginalUrlResponse { original_url }))
    }

    async fn get_user_urls(
        &self,
        request: Request<proto::GetUserUrlsRequest>,
    ) -> Result<Response<proto::GetUserUrlsResponse>, Status> {
        let owner_id = caller(&request).ok_or(GrpcError::Unauthenticated)?;

        let urls = self
            .shortener
            .list_by_owner(&owner_id)
            .await
            .map_err(GrpcError::from)?;

        Ok(Response::new(proto::GetUserUrlsResponse {
            urls: urls.into_iter().map(Into::into).collect(),
        }))
    }

    async fn batch_delete(
        &self,
        request: Request<proto::BatchDeleteRequest>,
    ) -> Result<Response<proto::BatchDeleteResponse>, Status> {
        let owner_id = caller(&request).ok_or(GrpcError::Unauthenticated)?;
        let codes = proto::parse_codes(request.get_ref()).map_err(GrpcError::from)?;
        if codes.is_empty() {
            return Err(GrpcError::from(burrow_core::ShortenerError::EmptyBatch).into());
        }

        self.shortener.delete_batch(&owner_id, codes);
        Ok(Response::new(proto::BatchDeleteResponse {}))
    }

    async fn get_stats(
        &self,
        request: Request<proto::GetStatsRequest>,
    ) -> Result<Response<proto::GetStatsResponse>, Status> {
        let ip = client_ip(&request);
        let trusted = match (&self.trusted_subnet, ip) {
            (Some(subnet), Some(ip)) => subnet.contains(&ip),
            _ => false,
        };
        if !trusted {
            warn!(client_ip = ?ip, "rejected stats request from untrusted client");
            return Err(GrpcError::PermissionDenied.into());
        }

        let stats = self.shortener.stats().await.map_err(GrpcError::from)?;
        Ok(Response::new(stats.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_generator::RandomGenerator;
    use burrow_shortener::ShortenerService as Service;
    use burrow_storage::InMemoryRepository;
    use tonic::Code;

    fn server(
        trusted_subnet: Option<&str>,
    ) -> ShortenerGrpcServer<Service<RandomGenerator>> {
        let service = Service::new(
            Arc::new(InMemoryRepository::new()),
            RandomGenerator::new(),
            "http://localhost:8080",
        );
        ShortenerGrpcServer::new(
            Arc::new(service),
            trusted_subnet.map(|s| s.parse().unwrap()),
        )
    }

    fn with_user<T>(message: T, owner_id: &str) -> Request<T> {
        let mut request = Request::new(message);
        request
            .metadata_mut()
            .insert(USER_ID_KEY, owner_id.parse().unwrap());
        request
    }

    fn create(url: &str) -> proto::CreateUrlRequest {
        proto::CreateUrlRequest {
            original_url: url.to_string(),
        }
    }

    fn code_of(short_url: &str) -> String {
        short_url.rsplit('/').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_assigns_identity_when_missing() {
        let server = server(None);

        let response = server
            .create_url(Request::new(create("https://example.com")))
            .await
            .unwrap();

        let assigned = response.metadata().get(USER_ID_KEY).unwrap();
        assert!(!assigned.to_str().unwrap().is_empty());
        assert!(response
            .get_ref()
            .short_url
            .starts_with("http://localhost:8080/"));
    }

    #[tokio::test]
    async fn create_keeps_supplied_identity() {
        let server = server(None);

        let response = server
            .create_url(with_user(create("https://example.com"), "u1"))
            .await
            .unwrap();
        assert!(response.metadata().get(USER_ID_KEY).is_none());

        let listed = server
            .get_user_urls(with_user(proto::GetUserUrlsRequest {}, "u1"))
            .await
            .unwrap();
        assert_eq!(listed.get_ref().urls.len(), 1);
        assert_eq!(listed.get_ref().urls[0].original_url, "https://example.com");
    }

    #[tokio::test]
    async fn duplicate_is_already_exists_with_existing_url() {
        let server = server(None);
        let first = server
            .create_url(with_user(create("https://example.com"), "u1"))
            .await
            .unwrap()
            .into_inner()
            .short_url;

        let status = server
            .create_url(with_user(create("https://example.com"), "u1"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), first);
    }

    #[tokio::test]
    async fn resolve_and_delete_round_trip() {
        let server = server(None);
        let short_url = server
            .create_url(with_user(create("https://example.com"), "u1"))
            .await
            .unwrap()
            .into_inner()
            .short_url;
        let code = code_of(&short_url);

        let resolved = server
            .get_original_url(Request::new(proto::GetOriginalUrlRequest {
                short_code: code.clone(),
            }))
            .await
            .unwrap();
        assert_eq!(resolved.get_ref().original_url, "https://example.com");

        server
            .batch_delete(with_user(
                proto::BatchDeleteRequest {
                    short_codes: vec![code.clone()],
                },
                "u1",
            ))
            .await
            .unwrap();

        let mut last = Code::Ok;
        for _ in 0..100 {
            let result = server
                .get_original_url(Request::new(proto::GetOriginalUrlRequest {
                    short_code: code.clone(),
                }))
                .await;
            if let Err(status) = result {
                last = status.code();
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(last, Code::FailedPrecondition);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let status = server(None)
            .get_original_url(Request::new(proto::GetOriginalUrlRequest {
                short_code: "missing".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn listing_and_deleting_require_identity() {
        let server = server(None);

        let status = server
            .get_user_urls(Request::new(proto::GetUserUrlsRequest {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);

        let status = server
            .batch_delete(Request::new(proto::BatchDeleteRequest {
                short_codes: vec!["abc".to_string()],
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[tokio::test]
    async fn batch_shorten_preserves_order() {
        let server = server(None);

        let response = server
            .batch_shorten(with_user(
                proto::BatchShortenRequest {
                    items: vec![
                        proto::BatchItem {
                            correlation_id: "1".to_string(),
                            original_url: "https://one.example".to_string(),
                        },
                        proto::BatchItem {
                            correlation_id: "2".to_string(),
                            original_url: "https://two.example".to_string(),
                        },
                    ],
                },
                "u1",
            ))
            .await
            .unwrap();

        let ids: Vec<&str> = response
            .get_ref()
            .results
            .iter()
            .map(|r| r.correlation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let status = server
            .batch_shorten(with_user(proto::BatchShortenRequest { items: vec![] }, "u1"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn stats_are_gated_by_trusted_subnet() {
        let untrusted = server(None);
        let mut request = Request::new(proto::GetStatsRequest {});
        request
            .metadata_mut()
            .insert(REAL_IP_KEY, "10.0.0.5".parse().unwrap());
        let status = untrusted.get_stats(request).await.unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);

        let server = server(Some("10.0.0.0/24"));
        server
            .create_url(with_user(create("https://example.com"), "u1"))
            .await
            .unwrap();

        let mut request = Request::new(proto::GetStatsRequest {});
        request
            .metadata_mut()
            .insert(REAL_IP_KEY, "10.0.0.5".parse().unwrap());
        let stats = server.get_stats(request).await.unwrap().into_inner();
        assert_eq!(stats.urls, 1);
        assert_eq!(stats.users, 1);

        let mut request = Request::new(proto::GetStatsRequest {});
        request
            .metadata_mut()
            .insert(REAL_IP_KEY, "192.168.1.1".parse().unwrap());
        let status = server.get_stats(request).await.unwrap_err();
        assert_eq!(status.code(), Code::PermissionDenied);
    }
}

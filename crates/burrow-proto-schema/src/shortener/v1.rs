use burrow_core as core;
use thiserror::Error;

tonic::include_proto!("burrow.shortener.v1");

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("short code is required")]
    MissingCode,
    #[error("short code is malformed: {0}")]
    MalformedCode(String),
}

impl TryFrom<&GetOriginalUrlRequest> for core::ShortCode {
    type Error = ConversionError;

    fn try_from(request: &GetOriginalUrlRequest) -> Result<Self, Self::Error> {
        parse_code(&request.short_code)
    }
}

/// Parses every code of a delete request, failing on the first bad one.
pub fn parse_codes(request: &BatchDeleteRequest) -> Result<Vec<core::ShortCode>, ConversionError> {
    request.short_codes.iter().map(|code| parse_code(code)).collect()
}

fn parse_code(raw: &str) -> Result<core::ShortCode, ConversionError> {
    let raw = raw.trim().trim_start_matches('/');
    if raw.is_empty() {
        return Err(ConversionError::MissingCode);
    }
    core::ShortCode::parse(raw).map_err(|e| ConversionError::MalformedCode(e.to_string()))
}

impl From<BatchItem> for core::BatchItem {
    fn from(item: BatchItem) -> Self {
        Self {
            correlation_id: item.correlation_id,
            original_url: item.original_url,
        }
    }
}

impl From<core::BatchResult> for BatchResult {
    fn from(result: core::BatchResult) -> Self {
        Self {
            correlation_id: result.correlation_id,
            short_url: result.short_url,
        }
    }
}

impl From<core::OwnedUrl> for UserUrl {
    fn from(url: core::OwnedUrl) -> Self {
        Self {
            short_url: url.short_url,
            original_url: url.original_url,
        }
    }
}

impl From<core::Stats> for GetStatsResponse {
    fn from(stats: core::Stats) -> Self {
        Self {
            urls: stats.urls,
            users: stats.users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_code_try_from_request() {
        let request = GetOriginalUrlRequest {
            short_code: "3mJr7AoUXx2".to_string(),
        };

        let code: core::ShortCode = (&request).try_into().expect("valid code");
        assert_eq!(code.as_str(), "3mJr7AoUXx2");
    }

    #[test]
    fn leading_slash_is_ignored() {
        let request = BatchDeleteRequest {
            short_codes: vec!["/abc123".to_string(), "def456".to_string()],
        };

        let codes = parse_codes(&request).unwrap();
        assert_eq!(codes[0].as_str(), "abc123");
        assert_eq!(codes[1].as_str(), "def456");
    }

    #[test]
    fn rejects_missing_and_malformed_codes() {
        let empty = GetOriginalUrlRequest {
            short_code: " ".to_string(),
        };
        let result: Result<core::ShortCode, _> = (&empty).try_into();
        assert!(matches!(result, Err(ConversionError::MissingCode)));

        let request = BatchDeleteRequest {
            short_codes: vec!["3mJr7A".to_string(), "bad code!".to_string()],
        };
        assert!(matches!(
            parse_codes(&request),
            Err(ConversionError::MalformedCode(_))
        ));
    }

    #[test]
    fn stats_convert_to_response() {
        let response: GetStatsResponse = core::Stats { urls: 4, users: 2 }.into();
        assert_eq!(response.urls, 4);
        assert_eq!(response.users, 2);
    }
}

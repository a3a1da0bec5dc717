use serde::{Deserialize, Serialize};

/// Body of `POST /api/shorten`.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

/// Body of a `POST /api/shorten` response, for both the created and the
/// duplicate case.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

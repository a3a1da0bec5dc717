//! Caller identity and client address, as set by the front proxy.

use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;
use std::net::IpAddr;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const REAL_IP_HEADER: HeaderName = HeaderName::from_static("x-real-ip");

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identity of a caller that must already be known. Rejects with 401.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_str(&parts.headers, &USER_ID_HEADER)
            .map(|owner| Owner(owner.to_string()))
            .ok_or(AppError::Unauthenticated)
    }
}

/// Identity of a creating caller. Callers without one get a fresh id, which
/// [`Creator::attach`] echoes back in the response.
#[derive(Debug, Clone)]
pub struct Creator {
    pub owner_id: String,
    assigned: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for Creator {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match header_str(&parts.headers, &USER_ID_HEADER) {
            Some(owner) => Creator {
                owner_id: owner.to_string(),
                assigned: false,
            },
            None => Creator {
                owner_id: burrow_generator::owner_id(),
                assigned: true,
            },
        })
    }
}

impl Creator {
    /// Adds the `x-user-id` header if the identity was assigned here.
    pub fn attach(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.assigned {
            if let Ok(value) = HeaderValue::from_str(&self.owner_id) {
                response.headers_mut().insert(USER_ID_HEADER, value);
            }
        }
        response
    }
}

/// Client address from `X-Real-IP`, if present and well formed.
pub fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, &REAL_IP_HEADER).and_then(|raw| raw.parse().ok())
}

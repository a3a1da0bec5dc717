use crate::error::Result;
use crate::identity::Owner;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::{ShortCode, ShortenerError};

/// `GET /api/user/urls`: 204 when the caller owns nothing.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
) -> Result<Response> {
    let urls = state.shortener.list_by_owner(&owner_id).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls` with a JSON array of short codes. The deletion
/// runs in the background; the response only confirms it was scheduled.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(codes): Json<Vec<String>>,
) -> Result<StatusCode> {
    if codes.is_empty() {
        return Err(ShortenerError::EmptyBatch.into());
    }

    let codes = codes
        .into_iter()
        .map(|code| ShortCode::parse(code.trim().trim_start_matches('/')))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    state.shortener.delete_batch(&owner_id, codes);
    Ok(StatusCode::ACCEPTED)
}

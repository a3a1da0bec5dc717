use crate::error::Result;
use crate::identity::Creator;
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use burrow_core::{BatchItem, ShortCode, ShortenerError};
use tracing::debug;

/// `POST /` with the original URL as a plain-text body.
pub async fn create_plain_handler(
    State(state): State<AppState>,
    creator: Creator,
    body: String,
) -> Result<Response> {
    match state
        .shortener
        .create_one(body.trim(), &creator.owner_id)
        .await
    {
        Ok(short_url) => Ok(creator.attach((StatusCode::CREATED, short_url))),
        Err(ShortenerError::Duplicate(existing)) => {
            Ok(creator.attach((StatusCode::CONFLICT, existing)))
        }
        Err(err) => Err(err.into()),
    }
}

/// `POST /api/shorten` with `{"url": ...}`.
pub async fn create_json_handler(
    State(state): State<AppState>,
    creator: Creator,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let (status, result) = match state
        .shortener
        .create_one(request.url.trim(), &creator.owner_id)
        .await
    {
        Ok(short_url) => (StatusCode::CREATED, short_url),
        Err(ShortenerError::Duplicate(existing)) => (StatusCode::CONFLICT, existing),
        Err(err) => return Err(err.into()),
    };

    Ok(creator.attach((status, Json(ShortenResponse { result }))))
}

/// `POST /api/shorten/batch` with `[{"correlation_id", "original_url"}]`.
pub async fn create_batch_handler(
    State(state): State<AppState>,
    creator: Creator,
    Json(items): Json<Vec<BatchItem>>,
) -> Result<Response> {
    let results = state
        .shortener
        .create_batch(&creator.owner_id, items)
        .await?;

    Ok(creator.attach((StatusCode::CREATED, Json(results))))
}

/// `GET /{id}`: temporary redirect to the original URL.
pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let code = ShortCode::parse(&id)?;
    let original_url = state.shortener.get_original(&code).await?;

    debug!(code = %code, url = %original_url, "redirecting");
    Ok(Redirect::temporary(&original_url).into_response())
}

use crate::error::{AppError, Result};
use crate::identity::real_ip;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use burrow_core::Stats;
use tracing::warn;

/// `GET /api/internal/stats`, restricted to clients inside the trusted
/// subnet. No subnet configured means no client is trusted.
pub async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Stats>> {
    let ip = real_ip(&headers);
    let trusted = match (&state.trusted_subnet, ip) {
        (Some(subnet), Some(ip)) => subnet.contains(&ip),
        _ => false,
    };
    if !trusted {
        warn!(client_ip = ?ip, "rejected stats request from untrusted client");
        return Err(AppError::Forbidden);
    }

    Ok(Json(state.shortener.stats().await?))
}

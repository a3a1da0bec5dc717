use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use burrow_core::ShortenerError;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    Unauthenticated,
    Forbidden,
}

impl From<ShortenerError> for AppError {
    fn from(error: ShortenerError) -> Self {
        AppError::Shortener(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "missing caller identity").into_response()
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden").into_response(),
            AppError::Shortener(error) => match error {
                ShortenerError::Duplicate(existing) => {
                    (StatusCode::CONFLICT, existing).into_response()
                }
                ShortenerError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, error.to_string()).into_response()
                }
                ShortenerError::Gone { .. } => (StatusCode::GONE, error.to_string()).into_response(),
                ShortenerError::InvalidUrl(_)
                | ShortenerError::InvalidShortCode(_)
                | ShortenerError::EmptyBatch => {
                    warn!(error = %error, "rejected request");
                    (StatusCode::BAD_REQUEST, error.to_string()).into_response()
                }
                ShortenerError::Storage(source) => {
                    error!(error = %source, "storage failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
                }
            },
        }
    }
}

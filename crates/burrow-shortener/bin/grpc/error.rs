use burrow_core::ShortenerError;
use burrow_proto_schema::v1::ConversionError;
use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub(crate) enum GrpcError {
    #[error("missing caller identity")]
    Unauthenticated,
    #[error("client address is not trusted")]
    PermissionDenied,
    #[error("short code is malformed: {0}")]
    ShortCodeMalformed(String),
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
}

impl From<ConversionError> for GrpcError {
    fn from(error: ConversionError) -> Self {
        GrpcError::ShortCodeMalformed(error.to_string())
    }
}

impl From<GrpcError> for Status {
    fn from(error: GrpcError) -> Self {
        match error {
            GrpcError::Unauthenticated => {
                Status::new(Code::Unauthenticated, "missing caller identity")
            }
            GrpcError::PermissionDenied => {
                Status::new(Code::PermissionDenied, "client address is not trusted")
            }
            GrpcError::ShortCodeMalformed(source) => Status::new(Code::InvalidArgument, source),
            GrpcError::Shortener(source) => match source {
                ShortenerError::Duplicate(existing) => Status::new(Code::AlreadyExists, existing),
                ShortenerError::NotFound(short_url) => Status::new(Code::NotFound, short_url),
                ShortenerError::Gone { original_url } => Status::new(
                    Code::FailedPrecondition,
                    format!("url has been deleted: {original_url}"),
                ),
                err @ (ShortenerError::InvalidUrl(_)
                | ShortenerError::InvalidShortCode(_)
                | ShortenerError::EmptyBatch) => Status::new(Code::InvalidArgument, err.to_string()),
                ShortenerError::Storage(err) => {
                    tracing::error!(error = %err, "storage failure");
                    Status::new(Code::Internal, "internal storage error")
                }
            },
        }
    }
}

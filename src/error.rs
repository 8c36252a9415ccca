use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::models::ValidationErrors;

/// RepositoryError
///
/// Failures of the persistence layer itself, as opposed to records it refuses to save.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row a write or delete targeted is gone.
    #[error("blog {0} no longer exists")]
    Vanished(Uuid),
}

/// SaveError
///
/// The result of an insert or update. `Invalid` is recoverable: the handler re-renders the form.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("record is invalid")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// AppError
///
/// Hard failures of a controller operation.
///
/// `NotFound` is deliberately uniform: a missing blog, a secret blog seen by someone else and a blog
/// the requester does not own all produce the same 404.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    /// The body could not be read as a `blog` submission.
    #[error(transparent)]
    Params(#[from] JsonRejection),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "not found" })),
            )
                .into_response(),
            AppError::Params(rejection) => rejection.into_response(),
            AppError::Store(e) => {
                tracing::error!("store failure: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

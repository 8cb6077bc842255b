use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shelf_core::{RepositoryError, ValidationError};

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    NotFound(String),
    MethodNotAllowed(String),
    UnsupportedMediaType(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(err) => {
                tracing::warn!("Validation failed ({}): {}", err.reason(), err);
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            AppError::UnsupportedMediaType(msg) => {
                tracing::error!("{}", msg);
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg)
            }
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "status_code": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

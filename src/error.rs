use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::db::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Every rule the input broke, in the order they were checked.
    #[error("validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("user is not registered for this event")]
    NotRegistered,

    #[error("user with this email already exists")]
    DuplicateEmail,

    #[error("user is already registered for this event")]
    AlreadyRegistered,

    #[error("write failed: {0:#}")]
    WriteFailed(anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::NotRegistered => (StatusCode::NOT_FOUND, "not_registered"),
            AppError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email"),
            AppError::AlreadyRegistered => (StatusCode::CONFLICT, "already_registered"),
            AppError::WriteFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "write_failed"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = match self {
            AppError::Validation(errors) => ErrorBody {
                error: code,
                message: "Request validation failed".into(),
                errors: Some(errors),
            },
            AppError::Unauthorized(msg) => ErrorBody {
                error: code,
                message: msg.into(),
                errors: None,
            },
            AppError::WriteFailed(e) => {
                // internals stay in the log
                error!(error = %format!("{e:#}"), "store write failed");
                ErrorBody {
                    error: code,
                    message: "The operation could not be completed".into(),
                    errors: None,
                }
            }
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                ErrorBody {
                    error: code,
                    message: "An internal error occurred".into(),
                    errors: None,
                }
            }
            other => ErrorBody {
                error: code,
                message: capitalize(&other.to_string()),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(e) => AppError::Internal(e),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_lists_every_message() {
        let (status, body) = body_json(AppError::Validation(vec![
            "Title is required and cannot be blank.".into(),
            "Image is required.".into(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!(
            "connection refused at 10.0.0.3:5432"
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn conflicts_map_to_409() {
        let (status, body) = body_json(AppError::AlreadyRegistered).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_registered");

        let (status, _) = body_json(AppError::DuplicateEmail).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_message_names_the_resource() {
        assert_eq!(AppError::NotFound("Event").to_string(), "Event not found");
    }
}

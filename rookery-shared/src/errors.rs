use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Account errors
/// - E2xxx: Follow graph errors
/// - E3xxx: Content (posts, comments, likes) errors
/// - E4xxx: Notification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Accounts (E1xxx)
    InvalidCredentials,
    UsernameTaken,
    EmailTaken,
    PasswordTooWeak,
    PasswordMismatch,
    TokenExpired,
    TokenInvalid,
    UserNotFound,

    // Follow graph (E2xxx)
    CannotFollowSelf,

    // Content (E3xxx)
    PostNotFound,
    CommentNotFound,

    // Notification (E4xxx)
    NotificationNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0007",

            // Accounts
            Self::InvalidCredentials => "E1001",
            Self::UsernameTaken => "E1002",
            Self::EmailTaken => "E1003",
            Self::PasswordTooWeak => "E1004",
            Self::PasswordMismatch => "E1005",
            Self::TokenExpired => "E1006",
            Self::TokenInvalid => "E1007",
            Self::UserNotFound => "E1008",

            // Follow graph
            Self::CannotFollowSelf => "E2001",

            // Content
            Self::PostNotFound => "E3001",
            Self::CommentNotFound => "E3002",

            // Notification
            Self::NotificationNotFound => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::PasswordMismatch | Self::CannotFollowSelf => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::PostNotFound
            | Self::CommentNotFound | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UsernameTaken | Self::EmailTaken => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let (status, value) =
            body_json(AppError::new(ErrorCode::PostNotFound, "post not found")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E3001");
        assert_eq!(value["error"]["message"], "post not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_rendered() {
        let err = AppError::with_details(
            ErrorCode::ValidationError,
            "invalid input",
            serde_json::json!({ "field": "title" }),
        );
        let (status, value) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"]["details"]["field"], "title");
    }

    #[tokio::test]
    async fn database_not_found_maps_to_404() {
        let (status, value) = body_json(AppError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"]["code"], "E0003");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let (status, value) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ErrorCode::CannotFollowSelf.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotificationNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::UsernameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn error_code_accessor() {
        assert_eq!(AppError::forbidden("no").code(), ErrorCode::Forbidden);
        assert_eq!(AppError::bad_request("bad").code(), ErrorCode::BadRequest);
        assert_eq!(
            AppError::Database(diesel::result::Error::NotFound).code(),
            ErrorCode::NotFound
        );
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Broad failure classes every error code folds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    ValidationFailed,
    Unauthorized,
    Unexpected,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E4xxx: Chat errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    PayloadTooLarge,
    Conflict,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    OAuthError,
    PasswordTooWeak,
    UserNotFound,

    // Chat (E4xxx)
    GroupNotFound,
    NotGroupMember,
    NotGroupAdmin,
    MemberAlreadyExists,
    MemberNotFound,
    MessageNotFound,
    NotMessageOwner,
    EmptyMessage,
    MessageTooLong,
    InvalidTarget,
    GroupNameRequired,
    FileNotFound,
    LogsNotFound,
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
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",
            Self::Conflict => "E0010",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::RefreshTokenRevoked => "E1006",
            Self::OAuthError => "E1007",
            Self::PasswordTooWeak => "E1008",
            Self::UserNotFound => "E1015",

            // Chat
            Self::GroupNotFound => "E4001",
            Self::NotGroupMember => "E4002",
            Self::MessageNotFound => "E4003",
            Self::GroupNameRequired => "E4004",
            Self::NotGroupAdmin => "E4005",
            Self::MemberAlreadyExists => "E4006",
            Self::MemberNotFound => "E4007",
            Self::NotMessageOwner => "E4008",
            Self::EmptyMessage => "E4009",
            Self::MessageTooLong => "E4010",
            Self::InvalidTarget => "E4011",
            Self::FileNotFound => "E4012",
            Self::LogsNotFound => "E4013",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InternalError => ErrorKind::Unexpected,
            Self::ValidationError | Self::BadRequest | Self::PayloadTooLarge
            | Self::PasswordTooWeak | Self::OAuthError | Self::EmptyMessage
            | Self::MessageTooLong | Self::InvalidTarget | Self::GroupNameRequired => ErrorKind::ValidationFailed,
            Self::NotFound | Self::UserNotFound | Self::GroupNotFound | Self::MemberNotFound
            | Self::MessageNotFound | Self::FileNotFound | Self::LogsNotFound => ErrorKind::NotFound,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => ErrorKind::Unauthorized,
            Self::Forbidden | Self::NotGroupMember | Self::NotGroupAdmin
            | Self::NotMessageOwner => ErrorKind::Forbidden,
            Self::Conflict | Self::EmailAlreadyExists | Self::MemberAlreadyExists => ErrorKind::Conflict,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => self.kind().status_code(),
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

    #[error("validation error: {0}")]
    Validation(String),
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

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Infrastructure failure; the message is logged, never sent to the client.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// The specific code, when the error came from a domain check.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Known { code, .. } => code.kind(),
            AppError::Validation(_) => ErrorKind::ValidationFailed,
            AppError::Database(diesel::result::Error::NotFound) => ErrorKind::NotFound,
            AppError::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => ErrorKind::Conflict,
            AppError::Internal(_) | AppError::Database(_) => ErrorKind::Unexpected,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, .. } if code.kind() == ErrorKind::Unexpected => {
                tracing::error!(code = code.code(), error = %message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(code.code(), "internal server error"),
                )
            }
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
                    diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new("E0010", "resource already exists"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "internal server error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chat_codes_map_to_their_kind() {
        assert_eq!(ErrorCode::MessageNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::NotMessageOwner.kind(), ErrorKind::Forbidden);
        assert_eq!(ErrorCode::NotGroupAdmin.kind(), ErrorKind::Forbidden);
        assert_eq!(ErrorCode::MemberAlreadyExists.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::EmptyMessage.kind(), ErrorKind::ValidationFailed);
        assert_eq!(ErrorCode::InternalError.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn status_follows_kind() {
        assert_eq!(ErrorCode::MemberAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::GroupNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn unique_violation_is_a_conflict() {
        let err = AppError::Database(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), None);
    }

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        use http_body_util::BodyExt;

        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let cases = [
            AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3")),
            AppError::internal("timed out waiting for connection to 10.0.0.3:5432"),
            AppError::new(ErrorCode::InternalError, "argon2: invalid salt length"),
        ];
        for err in cases {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"]["code"], "E0001");
            assert_eq!(body["error"]["message"], "internal server error");
        }
    }

    #[tokio::test]
    async fn domain_errors_keep_their_message() {
        let (status, body) = body_of(AppError::new(ErrorCode::MessageNotFound, "message not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E4003");
        assert_eq!(body["error"]["message"], "message not found");
    }
}

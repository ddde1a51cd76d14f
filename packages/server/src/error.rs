use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

pub const SUCCESS_CODE: i32 = 0;
pub const PARAM_ERROR_CODE: i32 = 40000;
pub const NOT_LOGIN_CODE: i32 = 40100;
pub const NO_AUTH_CODE: i32 = 40101;
pub const NOT_FOUND_CODE: i32 = 40400;
pub const SYSTEM_ERROR_CODE: i32 = 50000;
pub const OPERATION_ERROR_CODE: i32 = 50001;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code. One of: `40000` (parameter error), `40100`
    /// (not logged in), `40101` (no permission), `40400` (not found),
    /// `50000` (system error), `50001` (operation failed).
    #[schema(example = 40000)]
    pub code: i32,
    /// Human-readable error description.
    #[schema(example = "account exists")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed, missing or contradictory request fields.
    Param(String),
    NotLogin,
    /// Authenticated but lacking the required role or ownership.
    NoAuth,
    NotFound(String),
    /// A dependent step failed for reasons not attributable to the input.
    /// The message is shown to the caller; log the cause where it happens.
    Operation(String),
    /// Unexpected internal failure. The detail is logged, never returned.
    System(String),
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::Param(_) => PARAM_ERROR_CODE,
            AppError::NotLogin => NOT_LOGIN_CODE,
            AppError::NoAuth => NO_AUTH_CODE,
            AppError::NotFound(_) => NOT_FOUND_CODE,
            AppError::Operation(_) => OPERATION_ERROR_CODE,
            AppError::System(_) => SYSTEM_ERROR_CODE,
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let code = self.code();
        match self {
            AppError::Param(message) => (StatusCode::BAD_REQUEST, ErrorBody { code, message }),
            AppError::NotLogin => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code,
                    message: "not logged in".into(),
                },
            ),
            AppError::NoAuth => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code,
                    message: "no permission".into(),
                },
            ),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody { code, message }),
            AppError::Operation(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { code, message },
            ),
            AppError::System(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code,
                        message: "system error".into(),
                    },
                )
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Param(msg) => write!(f, "parameter error: {msg}"),
            AppError::NotLogin => f.write_str("not logged in"),
            AppError::NoAuth => f.write_str("no permission"),
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::Operation(msg) => write!(f, "operation failed: {msg}"),
            AppError::System(detail) => write!(f, "system error: {detail}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::System(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                tracing::warn!("Asset not found: {key}");
                AppError::NotFound("asset not found".into())
            }
            StorageError::Backend(detail) => {
                tracing::error!("Asset store write failed: {detail}");
                AppError::Operation("upload picture failed".into())
            }
            StorageError::MissingImageInfo { key, reason } => {
                tracing::warn!("No image info for {key}: {reason}");
                AppError::Operation("picture could not be analysed".into())
            }
            other => AppError::System(other.to_string()),
        }
    }
}

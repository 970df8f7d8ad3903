//! Error types for the Athenaeum server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-checkable reason codes surfaced alongside human-readable messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReasonCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    StoreFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    NoSuchRecord = 6,
    NoSuchReservation = 7,
    AlreadyBorrowed = 8,
    NoCopiesAvailable = 9,
    NotLowStock = 10,
    OutOfStock = 11,
    ReservedByAnotherUser = 12,
    LateReturn = 13,
    SelfRoleChange = 14,
    BadValue = 15,
    Duplicate = 16,
    InvariantViolation = 17,
    BookHasActiveLoans = 18,
}

/// Main application error type.
///
/// Precondition failures and not-found lookups are expected outcomes and are
/// returned as values; only store failures and invariant violations are
/// treated as exceptional.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("{message}")]
    NotFound { code: ReasonCode, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    Precondition { code: ReasonCode, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    /// Ledger invariant broken. Should be unreachable if the transaction
    /// protocol is implemented correctly.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a not-found error with the matching reason code
    pub fn not_found(code: ReasonCode, message: impl Into<String>) -> Self {
        AppError::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a rejected precondition with the matching reason code
    pub fn precondition(code: ReasonCode, message: impl Into<String>) -> Self {
        AppError::Precondition {
            code,
            message: message.into(),
        }
    }

    /// The reason code reported to callers
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ReasonCode::NotAuthorized,
            AppError::NotFound { code, .. } | AppError::Precondition { code, .. } => *code,
            AppError::Validation(_) => ReasonCode::BadValue,
            AppError::Conflict(_) => ReasonCode::Duplicate,
            AppError::Store(_) => ReasonCode::StoreFailure,
            AppError::Invariant(_) => ReasonCode::InvariantViolation,
            AppError::Internal(_) => ReasonCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.reason_code();
        let (status, message) = match &self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Precondition { message, .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Store(msg) => {
                tracing::error!("Store error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not reach the document store".to_string(),
                )
            }
            AppError::Invariant(msg) => {
                tracing::error!("Invariant violation: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal consistency error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

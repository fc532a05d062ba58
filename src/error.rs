//! Error types for the storage port, the batch writer and the HTTP surface.
//!
//! [`StorageError`] is raised by storage backends, [`BatchError`] by the
//! [`crate::service::BatchWriter`], and [`GatewayError`] is what handlers
//! return. Each [`GatewayError`] variant maps to a specific HTTP status code
//! and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::TxState;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "could not complete the transaction: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Error returned by the PostgreSQL driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key already exists in the table.
    #[error("duplicate key in {table}: {key}")]
    UniqueViolation {
        /// Table holding the conflicting row.
        table: &'static str,
        /// The duplicated key value.
        key: String,
    },

    /// An operation was issued in a transaction state that does not allow it.
    #[error("cannot {operation} while transaction is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the handle was in.
        state: TxState,
    },

    /// The backend could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure of an atomic bulk insert.
///
/// A [`BatchError::ResourceRelease`] never hides an earlier failure: the
/// error raised before the release attempt is kept in `prior`.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No connection could be acquired or the transaction could not begin.
    /// Nothing was written.
    #[error("could not connect to the database: {0}")]
    Connection(#[source] StorageError),

    /// A persist or commit step failed. Rollback was attempted.
    #[error("could not complete the transaction: {cause}")]
    Conflict {
        /// Input index of the record that failed, `None` when commit failed.
        failed_at: Option<usize>,
        /// Underlying storage failure.
        #[source]
        cause: StorageError,
    },

    /// Releasing the connection failed.
    #[error(
        "could not release the connection: {cause}{}",
        .prior.as_ref().map(|p| format!(" (after: {p})")).unwrap_or_default()
    )]
    ResourceRelease {
        /// Failure raised by the release itself.
        #[source]
        cause: StorageError,
        /// Error already raised before release was attempted, if any.
        prior: Option<Box<BatchError>>,
    },

    /// The task running the batch panicked or was cancelled by runtime
    /// shutdown. Whether it committed is unknown.
    #[error("batch did not finish: {0}")]
    Aborted(String),
}

impl BatchError {
    /// Returns the error raised before a failed release, if any.
    #[must_use]
    pub fn prior(&self) -> Option<&BatchError> {
        match self {
            Self::ResourceRelease { prior, .. } => prior.as_deref(),
            Self::Connection(_) | Self::Conflict { .. } | Self::Aborted(_) => None,
        }
    }

    /// Returns `true` if the connection could not be released.
    #[must_use]
    pub const fn is_release_failure(&self) -> bool {
        matches!(self, Self::ResourceRelease { .. })
    }
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                           |
/// |-----------|------------|---------------------------------------|
/// | 1000–1999 | Validation | 400 Bad Request                       |
/// | 2000–2999 | Conflict   | 409 Conflict                          |
/// | 3000–3999 | Server     | 500 Internal / 408 Request Timeout    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Atomic bulk insert failed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Read from the store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Batch(BatchError::Conflict { .. }) => 2001,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::Batch(BatchError::Connection(_)) => 3002,
            Self::Batch(BatchError::ResourceRelease { .. }) => 3003,
            Self::Batch(BatchError::Aborted(_)) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Batch(BatchError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Batch(BatchError::Connection(_) | BatchError::ResourceRelease { .. }) => {
                StatusCode::REQUEST_TIMEOUT
            }
            Self::Batch(BatchError::Aborted(_)) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Batch(BatchError::Conflict {
                failed_at: Some(index),
                ..
            }) => Some(format!("record at index {index} was rejected")),
            Self::Batch(err) => err.prior().map(ToString::to_string),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

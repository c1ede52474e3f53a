//! Error types for bookstore operations.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::{BookId, FieldError};

/// Errors that can occur during catalog store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested book was not found in the store.
    #[error("book not found in catalog store")]
    NotFound,
    /// JSON serialization or deserialization of stored fields failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The database rejected or failed an operation.
    #[error("database error: {0}")]
    Database(String),
    /// An internal storage error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Serialization(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Errors reported by the mutation gateway.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The submitted book failed validation; no store call was made.
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
    /// No book with this id exists, including one deleted while an update was in flight.
    #[error("book {0} not found")]
    NotFound(BookId),
    /// The store failed the write for a reason other than a vanished record.
    #[error("conflicting write to book {id}: {source}")]
    Conflict {
        /// The book being written.
        id: BookId,
        /// What the store reported.
        source: StoreError,
    },
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request payload failed validation.
    #[error("{}", join_fields(.0))]
    Validation(Vec<FieldError>),
    /// The addressed book does not exist.
    #[error("book {0} not found")]
    NotFound(BookId),
    /// A write conflicted with the stored state.
    #[error("{0}")]
    Conflict(String),
    /// The store failed a read.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl From<MutationError> for ApiError {
    fn from(e: MutationError) -> Self {
        match e {
            MutationError::Validation(fields) => ApiError::Validation(fields),
            MutationError::NotFound(id) => ApiError::NotFound(id),
            conflict @ MutationError::Conflict { .. } => ApiError::Conflict(conflict.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let ApiError::Validation(fields) = &self {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

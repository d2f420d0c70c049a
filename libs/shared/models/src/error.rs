use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Past date: {0}")]
    PastDate(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Carries the serialized records that block the requested slot.
    #[error("Conflict: {message}")]
    Conflict { message: String, conflicts: Value },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable failure kind exposed to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInterval(_) => "invalid_interval",
            AppError::PastDate(_) => "past_date",
            AppError::InvalidId(_) => "invalid_id",
            AppError::MissingParameter(_) => "missing_parameter",
            AppError::ValidationError(_) => "validation_error",
            AppError::Conflict { .. } => "conflict",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInterval(_)
            | AppError::PastDate(_)
            | AppError::InvalidId(_)
            | AppError::MissingParameter(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let body = match self {
            AppError::Internal(detail) => {
                // Detail stays in the logs; clients only get the generic message.
                tracing::error!("Error: {}: {}", status, detail);
                json!({ "error": INTERNAL_ERROR_MESSAGE, "kind": kind })
            }
            AppError::Conflict { message, conflicts } => {
                tracing::warn!("Error: {}: {}", status, message);
                json!({ "error": message, "kind": kind, "conflicts": conflicts })
            }
            AppError::NotFound(message)
            | AppError::InvalidInterval(message)
            | AppError::PastDate(message)
            | AppError::InvalidId(message)
            | AppError::MissingParameter(message)
            | AppError::ValidationError(message) => {
                tracing::warn!("Error: {}: {}", status, message);
                json!({ "error": message, "kind": kind })
            }
        };

        (status, Json(body)).into_response()
    }
}

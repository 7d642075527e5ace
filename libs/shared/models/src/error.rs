use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A 409 whose body carries extra machine-readable fields next to `error`.
    #[error("Conflict: {message}")]
    Conflict { message: String, details: Value },
}

impl AppError {
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            details: Value::Null,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg, Value::Null),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, Value::Null),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Value::Null),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, Value::Null),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            AppError::Conflict { message, details } => (StatusCode::CONFLICT, message, details),
        };

        tracing::error!("Error: {}: {}", status, message);

        let mut body = json!({
            "error": message
        });

        if let (Value::Object(extra), Some(obj)) = (details, body.as_object_mut()) {
            obj.extend(extra);
        }

        (status, Json(body)).into_response()
    }
}

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::modules::ServiceError;

/// Canonical JSON payload for error responses.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Helper for controllers that need to return `(StatusCode, Json<ApiMessage>)`.
pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiMessage>) {
    (status, Json(ApiMessage::new(message)))
}

/// Translate a service error into an HTTP response. Validation messages are
/// shown verbatim; backend detail goes to the log and the caller sees only
/// the generic message for the operation.
pub fn service_error(
    err: ServiceError,
    generic_message: &str,
) -> (StatusCode, Json<ApiMessage>) {
    match err {
        ServiceError::Validation(message) => json_error(StatusCode::UNPROCESSABLE_ENTITY, message),
        ServiceError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, format!("{what} not found."))
        }
        ServiceError::Backend(err) => {
            error!(?err, "backend call failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, generic_message)
        }
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::service::ServiceError;
use crate::uploads::UploadError;

// ============================================================================
// Error body
// ============================================================================

/// Body of every error response: a single human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Message sent in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// Either a client failure (4xx, message is shown) or a server error (5xx,
/// message is logged only).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, msg) => {
                tracing::warn!(status = code.as_u16(), error = %msg, "Request failed");
                (code, Json(ErrorBody { error: msg })).into_response()
            }
            ApiError::Error(code, msg) => {
                tracing::error!(status = code.as_u16(), error = %msg, "Request errored");
                let message = if code == StatusCode::INTERNAL_SERVER_ERROR {
                    INTERNAL_ERROR_MESSAGE.to_string()
                } else {
                    msg
                };
                (code, Json(ErrorBody { error: message })).into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(message) => ApiError::bad_request(message),
            ServiceError::NotFound(message) => ApiError::not_found(message),
            ServiceError::Internal(message) => ApiError::internal(message),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        ServiceError::from(e).into()
    }
}

/// Translate a JSON body rejection into a client-facing message.
pub fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            format!("Invalid request body: {}", err.body_text())
        }
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
        JsonRejection::MissingJsonContentType(_) => {
            "Missing Content-Type: application/json header".into()
        }
        _ => "Failed to read request body".into(),
    }
}

// ============================================================================
// Custom extractors
// ============================================================================

/// Drop-in replacement for `axum::extract::Query` that rejects with `ApiError`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameters: {cleaned}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_friendly_query_error() {
        assert_eq!(
            friendly_query_error("invalid type: expected u64"),
            "Invalid query parameters: invalid type: expected non-negative integer"
        );
    }
}

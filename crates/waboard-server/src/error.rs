use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use waboard_graph::GraphError;
use waboard_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not configured: {0}")]
    Configuration(String),

    /// Non-success response from the messaging provider.  The provider's
    /// HTTP status is passed through verbatim, not remapped.
    #[error("Messaging provider error ({status}): {message}")]
    ExternalApi {
        status: u16,
        message: String,
        token_expired: bool,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Wrap a Graph API failure.  Provider errors keep their own HTTP
    /// status; transport failures surface as 502.
    pub fn external(err: GraphError) -> Self {
        let token_expired = err.is_token_expired();
        let status = err.status().unwrap_or(502);
        ApiError::ExternalApi {
            status,
            message: err.to_string(),
            token_expired,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("record not found".into()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ApiError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ApiError::ExternalApi {
                status,
                message,
                token_expired,
            } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                let body = if *token_expired {
                    serde_json::json!({ "error": message, "errorType": "TOKEN_EXPIRED" })
                } else {
                    serde_json::json!({ "error": message })
                };
                (code, body)
            }
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ApiError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ApiError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Storage error" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

//! Translation of vault errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use passweb_common::Error;

/// Error returned by API handlers.
///
/// Internal failures are logged in full and answered with a generic message.
#[derive(Debug)]
pub enum ApiError {
    /// Body could not be parsed.
    BadRequest,
    /// No `X-Session-ID` header.
    MissingSession,
    Vault(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Vault(e)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest => (StatusCode::BAD_REQUEST, "invalid request".to_string()),
            Self::MissingSession => (StatusCode::UNAUTHORIZED, "missing session id".to_string()),
            Self::Vault(e) => match e {
                Error::AuthenticationFailed => {
                    (StatusCode::UNAUTHORIZED, "invalid password".to_string())
                }
                Error::InvalidSession => (StatusCode::UNAUTHORIZED, "invalid session".to_string()),
                Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.to_lowercase()),
                Error::AlreadyInitialized => {
                    (StatusCode::CONFLICT, "vault already initialized".to_string())
                }
                Error::VaultNotInitialized => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "vault not initialized".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            if let Self::Vault(e) = &self {
                error!(error = %e, corruption = e.is_corruption(), "Request failed");
            }
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

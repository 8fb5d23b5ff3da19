use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("token expired")]
    Expired,
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            jsonwebtoken::errors::ErrorKind::Json(err) => Self::InvalidJson(err.to_string()),
            _ => Self::Verification(value.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Every auth failure is reported as the same 401 envelope; the precise
        // cause stays server-side.
        tracing::debug!(error = %self, "rejecting request at the authentication gate");
        let body = ErrorBody {
            success: false,
            message: "Unauthorized".to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform response wrapper: `{success, message, data?}`.
#[derive(Serialize, Debug)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 envelope with payload.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::OK, true, message, Some(data))
}

/// 200 envelope without payload.
pub fn ok_message(message: impl Into<String>) -> Response {
    envelope::<()>(StatusCode::OK, true, message, None)
}

/// 201 envelope with the created entity.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::CREATED, true, message, Some(data))
}

fn envelope<T: Serialize>(
    status: StatusCode,
    success: bool,
    message: impl Into<String>,
    data: Option<T>,
) -> Response {
    let body = Envelope {
        success,
        message: message.into(),
        data,
    };
    (status, Json(body)).into_response()
}

/// One field-level violation in a validation report.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Every violation found in the input, reported together.
    Validation(Vec<FieldError>),
    BadRequest { message: String },
    Unauthorized { message: String },
    Forbidden,
    NotFound { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, data, error_code) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                Some(errors),
                "validation_error",
            ),
            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, message, None, "bad_request")
            }
            ApiError::Unauthorized { message } => {
                (StatusCode::UNAUTHORIZED, message, None, "unauthorized")
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Forbidden: Insufficient permissions".to_string(),
                None,
                "forbidden",
            ),
            ApiError::NotFound { message } => {
                (StatusCode::NOT_FOUND, message, None, "not_found")
            }
            ApiError::Internal { message } => {
                // Detail stays server-side; the client gets a generic string.
                tracing::error!(detail = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                    "internal_error",
                )
            }
        };

        let body = Envelope {
            success: false,
            message,
            data,
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400_with_field_list() {
        let err = ApiError::Validation(vec![
            FieldError::new("diskon", "Discount cannot exceed 100%"),
            FieldError::new("pajak", "Tax must be non-negative."),
        ]);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("X-Error-Code").unwrap(),
            "validation_error"
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError::not_found("Outlet not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_hides_detail() {
        let resp = ApiError::internal("connection refused").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

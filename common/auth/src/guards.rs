use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::AuthContext;

#[derive(Debug, Clone)]
pub enum GuardError {
    Forbidden,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: "Forbidden: Insufficient permissions".to_string(),
        };
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

/// Whether `role` satisfies a route's static allow-list.
///
/// An empty list means the route is authentication-only.
pub fn allows(role: &str, allowed: &[&str]) -> bool {
    allowed.is_empty() || allowed.contains(&role)
}

/// Route-level role gate; call first thing in a handler body.
pub fn ensure_role(auth: &AuthContext, allowed: &[&str]) -> Result<(), GuardError> {
    if allows(&auth.claims.role, allowed) {
        Ok(())
    } else {
        Err(GuardError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};

    #[test]
    fn allows_matches_listed_roles() {
        assert!(allows(ROLE_ADMIN, &[ROLE_ADMIN, ROLE_KASIR]));
        assert!(allows(ROLE_KASIR, &[ROLE_ADMIN, ROLE_KASIR]));
        assert!(!allows(ROLE_OWNER, &[ROLE_ADMIN, ROLE_KASIR]));
    }

    #[test]
    fn empty_list_is_authentication_only() {
        assert!(allows(ROLE_OWNER, &[]));
        assert!(allows("anything", &[]));
    }
}

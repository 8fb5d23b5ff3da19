use axum::extract::State;
use axum::response::Response;
use axum::Json;
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::warn;

use crate::app::{db_internal, AppState};
use crate::tokens::TokenSubject;
use crate::user_handlers::{insert_user, username_taken, validate_new_user, verify_password, UserInput};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(FromRow)]
struct AuthRow {
    id: i32,
    nama: String,
    username: String,
    password: String,
    role: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> ApiResult<Response> {
    let values = validate_new_user(&input)?;

    if username_taken(&state, &values.username).await? {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let user = insert_user(&state, &values).await?;
    Ok(created("User created successfully", user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> ApiResult<Response> {
    let (username, password) = match (input.username, input.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username, password)
        }
        _ => {
            return Err(ApiError::bad_request("Username and password are required"));
        }
    };

    let row = sqlx::query_as::<_, AuthRow>(
        "SELECT id, nama, username, password, role FROM users WHERE username = $1",
    )
    .bind(&username)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let row = match row {
        Some(row) => row,
        None => return Err(ApiError::unauthorized("Invalid username or password")),
    };

    if !verify_password(&password, &row.password) {
        warn!(username = %row.username, "failed login attempt");
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let subject = TokenSubject {
        id: row.id,
        nama: row.nama,
        username: row.username,
        role: row.role,
    };

    let issued = state
        .token_signer
        .issue(&subject)
        .map_err(|err| ApiError::internal(format!("Failed to issue session token: {err}")))?;

    Ok(ok("Logged in successfully", json!({ "token": issued.token })))
}

pub async fn logout() -> Response {
    // Tokens are stateless; logout is an acknowledgment only.
    ok_message("Logged out successfully")
}

pub async fn me(auth: common_auth::AuthContext) -> Response {
    ok("Success", auth.into_claims())
}

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_HIERARCHY};
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::outlet_handlers::{load_outlets_by_id, Outlet};
use crate::validation::FieldErrors;

pub const USER_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN];

const USER_COLUMNS: &str = "id, nama, username, role, id_outlet, created_at";

/// Public view of a user record; the password hash never leaves the service.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub nama: String,
    pub username: String,
    pub role: String,
    pub id_outlet: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserWithOutlet {
    #[serde(flatten)]
    pub user: User,
    pub outlets: Option<Outlet>,
}

#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub nama: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub id_outlet: Option<i32>,
}

pub(crate) struct NewUserValues {
    pub nama: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub id_outlet: i32,
}

pub(crate) fn validate_new_user(input: &UserInput) -> Result<NewUserValues, ApiError> {
    let mut v = FieldErrors::new();
    let nama = v.require_str("nama", input.nama.as_deref(), 3, 50);
    let username = v.require_str("username", input.username.as_deref(), 3, 50);
    let password = v.require_str("password", input.password.as_deref(), 6, 50);
    let role = v.require_one_of("role", input.role.as_deref(), ROLE_HIERARCHY);
    let id_outlet = v.require_positive_i32("id_outlet", input.id_outlet);
    v.finish()?;

    Ok(NewUserValues {
        nama,
        username,
        password,
        role,
        id_outlet,
    })
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal(format!("Failed to hash password: {err}")))
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub(crate) async fn username_taken(state: &AppState, username: &str) -> ApiResult<bool> {
    let existing = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.db)
        .await
        .map_err(db_internal)?;
    Ok(existing.is_some())
}

pub(crate) async fn insert_user(state: &AppState, values: &NewUserValues) -> ApiResult<User> {
    let password_hash = hash_password(&values.password)?;

    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (nama, username, password, role, id_outlet)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&values.nama)
    .bind(&values.username)
    .bind(&password_hash)
    .bind(&values.role)
    .bind(values.id_outlet)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)
}

pub async fn list_users(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Response> {
    ensure_role(&auth, USER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    let outlets = load_outlets_by_id(&state).await?;
    let users = users
        .into_iter()
        .map(|user| {
            let outlet = outlets.get(&user.id_outlet).cloned();
            UserWithOutlet {
                user,
                outlets: outlet,
            }
        })
        .collect::<Vec<_>>();

    Ok(ok("Success", users))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, USER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let user = fetch_user(&state, id).await?;
    Ok(ok("Success", user))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<UserInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, USER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let values = validate_new_user(&input)?;
    if username_taken(&state, &values.username).await? {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let user = insert_user(&state, &values).await?;
    Ok(created("User created successfully", user))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<UserInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, USER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_user(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(nama) = input.nama.as_deref() {
        v.str_len("nama", nama, 3, 50);
    }
    if let Some(username) = input.username.as_deref() {
        v.str_len("username", username, 3, 50);
    }
    if let Some(password) = input.password.as_deref() {
        v.str_len("password", password, 6, 50);
    }
    if let Some(role) = input.role.as_deref() {
        v.one_of("role", role, ROLE_HIERARCHY);
    }
    if let Some(id_outlet) = input.id_outlet {
        v.positive_i32("id_outlet", id_outlet);
    }
    v.finish()?;

    if let Some(username) = input.username.as_deref() {
        if username != existing.username && username_taken(&state, username).await? {
            return Err(ApiError::bad_request("Username already exists"));
        }
    }

    let nama = input.nama.unwrap_or(existing.nama);
    let username = input.username.unwrap_or(existing.username);
    let role = input.role.unwrap_or(existing.role);
    let id_outlet = input.id_outlet.unwrap_or(existing.id_outlet);

    let user = match input.password.as_deref() {
        Some(password) => {
            let password_hash = hash_password(password)?;
            sqlx::query_as::<_, User>(&format!(
                "UPDATE users SET nama = $1, username = $2, role = $3, id_outlet = $4, password = $5
                 WHERE id = $6 RETURNING {USER_COLUMNS}"
            ))
            .bind(&nama)
            .bind(&username)
            .bind(&role)
            .bind(id_outlet)
            .bind(&password_hash)
            .bind(id)
            .fetch_one(&state.db)
            .await
            .map_err(db_internal)?
        }
        None => sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET nama = $1, username = $2, role = $3, id_outlet = $4
             WHERE id = $5 RETURNING {USER_COLUMNS}"
        ))
        .bind(&nama)
        .bind(&username)
        .bind(&role)
        .bind(id_outlet)
        .bind(id)
        .fetch_one(&state.db)
        .await
        .map_err(db_internal)?,
    };

    Ok(ok("User updated successfully", user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, USER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(db_internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(ok_message("User deleted successfully"))
}

pub(crate) async fn fetch_user(state: &AppState, id: i32) -> ApiResult<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

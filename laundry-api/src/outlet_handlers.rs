use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::validation::FieldErrors;

pub const OUTLET_LIST_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];
pub const OUTLET_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN];

const OUTLET_COLUMNS: &str = "id, nama, alamat, tlp, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Outlet {
    pub id: i32,
    pub nama: String,
    pub alamat: String,
    pub tlp: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OutletInput {
    pub nama: Option<String>,
    pub alamat: Option<String>,
    pub tlp: Option<i64>,
}

pub async fn list_outlets(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    ensure_role(&auth, OUTLET_LIST_ROLES).map_err(|_| ApiError::Forbidden)?;

    let outlets = sqlx::query_as::<_, Outlet>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Success", outlets))
}

pub async fn get_outlet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, OUTLET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let outlet = fetch_outlet(&state, id).await?;
    Ok(ok("Success", outlet))
}

pub async fn create_outlet(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<OutletInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, OUTLET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut v = FieldErrors::new();
    let nama = v.require_str("nama", input.nama.as_deref(), 1, 100);
    let alamat = v.require_str("alamat", input.alamat.as_deref(), 1, 255);
    let tlp = v.require_positive_i64("tlp", input.tlp);
    v.finish()?;

    let outlet = sqlx::query_as::<_, Outlet>(&format!(
        "INSERT INTO outlets (nama, alamat, tlp) VALUES ($1, $2, $3) RETURNING {OUTLET_COLUMNS}"
    ))
    .bind(&nama)
    .bind(&alamat)
    .bind(tlp)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(created("Outlet created successfully", outlet))
}

pub async fn update_outlet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<OutletInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, OUTLET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_outlet(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(nama) = input.nama.as_deref() {
        v.str_len("nama", nama, 1, 100);
    }
    if let Some(alamat) = input.alamat.as_deref() {
        v.str_len("alamat", alamat, 1, 255);
    }
    if let Some(tlp) = input.tlp {
        v.positive_i64("tlp", tlp);
    }
    v.finish()?;

    let nama = input.nama.unwrap_or(existing.nama);
    let alamat = input.alamat.unwrap_or(existing.alamat);
    let tlp = input.tlp.unwrap_or(existing.tlp);

    let outlet = sqlx::query_as::<_, Outlet>(&format!(
        "UPDATE outlets SET nama = $1, alamat = $2, tlp = $3 WHERE id = $4 RETURNING {OUTLET_COLUMNS}"
    ))
    .bind(&nama)
    .bind(&alamat)
    .bind(tlp)
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Outlet updated successfully", outlet))
}

/// Removes the outlet and everything hanging off it: transaction lines,
/// transactions, packages and users, dependent-first inside one transaction.
pub async fn delete_outlet(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, OUTLET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut tx = state.db.begin().await.map_err(db_internal)?;

    let existing = sqlx::query_as::<_, Outlet>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_internal)?;
    if existing.is_none() {
        return Err(ApiError::not_found("Outlet not found"));
    }

    sqlx::query(
        "DELETE FROM detail_transaksi WHERE id_transaksi IN (SELECT id FROM transaksi WHERE id_outlet = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(db_internal)?;

    sqlx::query("DELETE FROM transaksi WHERE id_outlet = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    sqlx::query("DELETE FROM pakets WHERE id_outlet = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    sqlx::query("DELETE FROM users WHERE id_outlet = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    sqlx::query("DELETE FROM outlets WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    tx.commit().await.map_err(db_internal)?;

    Ok(ok_message("Outlet and related data deleted successfully"))
}

pub(crate) async fn fetch_outlet(state: &AppState, id: i32) -> ApiResult<Outlet> {
    sqlx::query_as::<_, Outlet>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?
    .ok_or_else(|| ApiError::not_found("Outlet not found"))
}

pub(crate) async fn load_outlets_by_id(
    state: &AppState,
) -> ApiResult<std::collections::HashMap<i32, Outlet>> {
    let outlets = sqlx::query_as::<_, Outlet>(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(outlets.into_iter().map(|o| (o.id, o)).collect())
}

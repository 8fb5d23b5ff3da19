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

pub const MEMBER_LIST_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];
pub const MEMBER_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR];

pub const GENDERS: &[&str] = &["laki_laki", "perempuan"];

const MEMBER_COLUMNS: &str = "id, nama, alamat, jenis_kelamin, tlp, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: i32,
    pub nama: String,
    pub alamat: String,
    pub jenis_kelamin: String,
    pub tlp: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MemberInput {
    pub nama: Option<String>,
    pub alamat: Option<String>,
    pub jenis_kelamin: Option<String>,
    pub tlp: Option<i64>,
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    ensure_role(&auth, MEMBER_LIST_ROLES).map_err(|_| ApiError::Forbidden)?;

    let members = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Success", members))
}

pub async fn get_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, MEMBER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let member = fetch_member(&state, id).await?;
    Ok(ok("Success", member))
}

pub async fn create_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<MemberInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, MEMBER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut v = FieldErrors::new();
    let nama = v.require_str("nama", input.nama.as_deref(), 3, 50);
    let alamat = v.require_str("alamat", input.alamat.as_deref(), 3, 100);
    let jenis_kelamin = v.require_one_of("jenis_kelamin", input.jenis_kelamin.as_deref(), GENDERS);
    let tlp = v.require_positive_i64("tlp", input.tlp);
    v.finish()?;

    let member = sqlx::query_as::<_, Member>(&format!(
        "INSERT INTO members (nama, alamat, jenis_kelamin, tlp)
         VALUES ($1, $2, $3, $4)
         RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(&nama)
    .bind(&alamat)
    .bind(&jenis_kelamin)
    .bind(tlp)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(created("Member created successfully", member))
}

pub async fn update_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<MemberInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, MEMBER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_member(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(nama) = input.nama.as_deref() {
        v.str_len("nama", nama, 3, 50);
    }
    if let Some(alamat) = input.alamat.as_deref() {
        v.str_len("alamat", alamat, 3, 100);
    }
    if let Some(jenis_kelamin) = input.jenis_kelamin.as_deref() {
        v.one_of("jenis_kelamin", jenis_kelamin, GENDERS);
    }
    if let Some(tlp) = input.tlp {
        v.positive_i64("tlp", tlp);
    }
    v.finish()?;

    let nama = input.nama.unwrap_or(existing.nama);
    let alamat = input.alamat.unwrap_or(existing.alamat);
    let jenis_kelamin = input.jenis_kelamin.unwrap_or(existing.jenis_kelamin);
    let tlp = input.tlp.unwrap_or(existing.tlp);

    let member = sqlx::query_as::<_, Member>(&format!(
        "UPDATE members SET nama = $1, alamat = $2, jenis_kelamin = $3, tlp = $4
         WHERE id = $5 RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(&nama)
    .bind(&alamat)
    .bind(&jenis_kelamin)
    .bind(tlp)
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Member updated successfully", member))
}

/// Removes the member together with their transactions and transaction lines,
/// dependent-first inside one transaction.
pub async fn delete_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, MEMBER_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut tx = state.db.begin().await.map_err(db_internal)?;

    let existing = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_internal)?;
    if existing.is_none() {
        return Err(ApiError::not_found("Member not found"));
    }

    sqlx::query(
        "DELETE FROM detail_transaksi WHERE id_transaksi IN (SELECT id FROM transaksi WHERE id_member = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(db_internal)?;

    sqlx::query("DELETE FROM transaksi WHERE id_member = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    sqlx::query("DELETE FROM members WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    tx.commit().await.map_err(db_internal)?;

    Ok(ok_message("Member and related data deleted successfully"))
}

pub(crate) async fn fetch_member(state: &AppState, id: i32) -> ApiResult<Member> {
    sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?
    .ok_or_else(|| ApiError::not_found("Member not found"))
}

pub(crate) async fn load_members_by_id(
    state: &AppState,
) -> ApiResult<std::collections::HashMap<i32, Member>> {
    let members = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(members.into_iter().map(|m| (m.id, m)).collect())
}

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::member_handlers::{load_members_by_id, Member};
use crate::outlet_handlers::{load_outlets_by_id, Outlet};
use crate::user_handlers::User;
use crate::validation::FieldErrors;

pub const TRANSAKSI_LIST_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];
pub const TRANSAKSI_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR];

pub const TRANSAKSI_STATUS: &[&str] = &["baru", "proses", "selesai", "diambil"];
pub const PAYMENT_STATUS: &[&str] = &["dibayar", "belum_dibayar"];

const TRANSAKSI_COLUMNS: &str = "id, id_outlet, kode_invoice, id_member, tgl, batas_waktu, \
     tgl_bayar, biaya_tambahan, diskon, pajak, status, dibayar, id_user";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Transaksi {
    pub id: i32,
    pub id_outlet: i32,
    pub kode_invoice: String,
    pub id_member: i32,
    pub tgl: DateTime<Utc>,
    pub batas_waktu: DateTime<Utc>,
    pub tgl_bayar: Option<DateTime<Utc>>,
    pub biaya_tambahan: f64,
    pub diskon: f64,
    pub pajak: f64,
    pub status: String,
    pub dibayar: String,
    pub id_user: i32,
}

#[derive(Debug, Serialize)]
pub struct TransaksiWithRelations {
    #[serde(flatten)]
    pub transaksi: Transaksi,
    pub outlets: Option<Outlet>,
    pub members: Option<Member>,
    pub users: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct TransaksiInput {
    pub id_outlet: Option<i32>,
    pub kode_invoice: Option<String>,
    pub id_member: Option<i32>,
    pub tgl: Option<DateTime<Utc>>,
    pub batas_waktu: Option<DateTime<Utc>>,
    // Double option: absent means untouched, explicit null clears the field.
    #[serde(default)]
    pub tgl_bayar: Option<Option<DateTime<Utc>>>,
    pub biaya_tambahan: Option<f64>,
    pub diskon: Option<f64>,
    pub pajak: Option<f64>,
    pub status: Option<String>,
    pub dibayar: Option<String>,
    pub id_user: Option<i32>,
}

pub async fn list_transaksi(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    ensure_role(&auth, TRANSAKSI_LIST_ROLES).map_err(|_| ApiError::Forbidden)?;

    let rows = sqlx::query_as::<_, Transaksi>(&format!(
        "SELECT {TRANSAKSI_COLUMNS} FROM transaksi ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    let outlets = load_outlets_by_id(&state).await?;
    let members = load_members_by_id(&state).await?;
    let users = load_users_by_id(&state).await?;

    let transaksi = rows
        .into_iter()
        .map(|row| TransaksiWithRelations {
            outlets: outlets.get(&row.id_outlet).cloned(),
            members: members.get(&row.id_member).cloned(),
            users: users.get(&row.id_user).cloned(),
            transaksi: row,
        })
        .collect::<Vec<_>>();

    Ok(ok("Success", transaksi))
}

pub async fn get_transaksi(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, TRANSAKSI_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let row = fetch_transaksi(&state, id).await?;

    let outlets = sqlx::query_as::<_, Outlet>(
        "SELECT id, nama, alamat, tlp, created_at FROM outlets WHERE id = $1",
    )
    .bind(row.id_outlet)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let members = sqlx::query_as::<_, Member>(
        "SELECT id, nama, alamat, jenis_kelamin, tlp, created_at FROM members WHERE id = $1",
    )
    .bind(row.id_member)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let users = sqlx::query_as::<_, User>(
        "SELECT id, nama, username, role, id_outlet, created_at FROM users WHERE id = $1",
    )
    .bind(row.id_user)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let transaksi = TransaksiWithRelations {
        transaksi: row,
        outlets,
        members,
        users,
    };

    Ok(ok("Success", transaksi))
}

pub async fn create_transaksi(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<TransaksiInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, TRANSAKSI_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut v = FieldErrors::new();
    let id_outlet = v.require_positive_i32("id_outlet", input.id_outlet);
    let kode_invoice = v.require_str("kode_invoice", input.kode_invoice.as_deref(), 1, 100);
    let id_member = v.require_positive_i32("id_member", input.id_member);
    let tgl = v.require_date("tgl", input.tgl);
    let batas_waktu = v.require_date("batas_waktu", input.batas_waktu);
    let biaya_tambahan = v.require_non_negative_f64("biaya_tambahan", input.biaya_tambahan);
    let diskon = v.require_percentage("diskon", input.diskon);
    let pajak = v.require_non_negative_f64("pajak", input.pajak);
    let status = v.require_one_of("status", input.status.as_deref(), TRANSAKSI_STATUS);
    let dibayar = v.require_one_of("dibayar", input.dibayar.as_deref(), PAYMENT_STATUS);
    let id_user = v.require_positive_i32("id_user", input.id_user);
    v.finish()?;

    let tgl_bayar = input.tgl_bayar.flatten();

    let transaksi = sqlx::query_as::<_, Transaksi>(&format!(
        "INSERT INTO transaksi (id_outlet, kode_invoice, id_member, tgl, batas_waktu, tgl_bayar,
                                biaya_tambahan, diskon, pajak, status, dibayar, id_user)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {TRANSAKSI_COLUMNS}"
    ))
    .bind(id_outlet)
    .bind(&kode_invoice)
    .bind(id_member)
    .bind(tgl)
    .bind(batas_waktu)
    .bind(tgl_bayar)
    .bind(biaya_tambahan)
    .bind(diskon)
    .bind(pajak)
    .bind(&status)
    .bind(&dibayar)
    .bind(id_user)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(created("Transaction created successfully", transaksi))
}

pub async fn update_transaksi(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<TransaksiInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, TRANSAKSI_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_transaksi(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(id_outlet) = input.id_outlet {
        v.positive_i32("id_outlet", id_outlet);
    }
    if let Some(kode_invoice) = input.kode_invoice.as_deref() {
        v.str_len("kode_invoice", kode_invoice, 1, 100);
    }
    if let Some(id_member) = input.id_member {
        v.positive_i32("id_member", id_member);
    }
    if let Some(biaya_tambahan) = input.biaya_tambahan {
        v.non_negative_f64("biaya_tambahan", biaya_tambahan);
    }
    if let Some(diskon) = input.diskon {
        v.percentage("diskon", diskon);
    }
    if let Some(pajak) = input.pajak {
        v.non_negative_f64("pajak", pajak);
    }
    if let Some(status) = input.status.as_deref() {
        v.one_of("status", status, TRANSAKSI_STATUS);
    }
    if let Some(dibayar) = input.dibayar.as_deref() {
        v.one_of("dibayar", dibayar, PAYMENT_STATUS);
    }
    if let Some(id_user) = input.id_user {
        v.positive_i32("id_user", id_user);
    }
    v.finish()?;

    let id_outlet = input.id_outlet.unwrap_or(existing.id_outlet);
    let kode_invoice = input.kode_invoice.unwrap_or(existing.kode_invoice);
    let id_member = input.id_member.unwrap_or(existing.id_member);
    let tgl = input.tgl.unwrap_or(existing.tgl);
    let batas_waktu = input.batas_waktu.unwrap_or(existing.batas_waktu);
    // Omitted leaves the paid date untouched; explicit null clears it.
    let tgl_bayar = match input.tgl_bayar {
        Some(value) => value,
        None => existing.tgl_bayar,
    };
    let biaya_tambahan = input.biaya_tambahan.unwrap_or(existing.biaya_tambahan);
    let diskon = input.diskon.unwrap_or(existing.diskon);
    let pajak = input.pajak.unwrap_or(existing.pajak);
    let status = input.status.unwrap_or(existing.status);
    let dibayar = input.dibayar.unwrap_or(existing.dibayar);
    let id_user = input.id_user.unwrap_or(existing.id_user);

    let transaksi = sqlx::query_as::<_, Transaksi>(&format!(
        "UPDATE transaksi
         SET id_outlet = $1, kode_invoice = $2, id_member = $3, tgl = $4, batas_waktu = $5,
             tgl_bayar = $6, biaya_tambahan = $7, diskon = $8, pajak = $9, status = $10,
             dibayar = $11, id_user = $12
         WHERE id = $13
         RETURNING {TRANSAKSI_COLUMNS}"
    ))
    .bind(id_outlet)
    .bind(&kode_invoice)
    .bind(id_member)
    .bind(tgl)
    .bind(batas_waktu)
    .bind(tgl_bayar)
    .bind(biaya_tambahan)
    .bind(diskon)
    .bind(pajak)
    .bind(&status)
    .bind(&dibayar)
    .bind(id_user)
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Transaction updated successfully", transaksi))
}

/// Removes the transaction and its lines inside one transaction.
pub async fn delete_transaksi(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, TRANSAKSI_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut tx = state.db.begin().await.map_err(db_internal)?;

    sqlx::query("DELETE FROM detail_transaksi WHERE id_transaksi = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    let result = sqlx::query("DELETE FROM transaksi WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Transaction not found"));
    }

    tx.commit().await.map_err(db_internal)?;

    Ok(ok_message("Transaction and related data deleted successfully"))
}

pub(crate) async fn fetch_transaksi(state: &AppState, id: i32) -> ApiResult<Transaksi> {
    sqlx::query_as::<_, Transaksi>(&format!(
        "SELECT {TRANSAKSI_COLUMNS} FROM transaksi WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?
    .ok_or_else(|| ApiError::not_found("Transaction not found"))
}

pub(crate) async fn load_users_by_id(
    state: &AppState,
) -> ApiResult<std::collections::HashMap<i32, User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, nama, username, role, id_outlet, created_at FROM users",
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

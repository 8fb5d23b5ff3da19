use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::paket_handlers::Paket;
use crate::transaksi_handlers::Transaksi;
use crate::validation::FieldErrors;

pub const DETAIL_LIST_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];
pub const DETAIL_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR];

const DETAIL_COLUMNS: &str = "id, id_transaksi, id_paket, qty, keterangan";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DetailTransaksi {
    pub id: i32,
    pub id_transaksi: i32,
    pub id_paket: i32,
    pub qty: i32,
    pub keterangan: String,
}

#[derive(Debug, Serialize)]
pub struct DetailWithRelations {
    #[serde(flatten)]
    pub detail: DetailTransaksi,
    pub transaksi: Option<Transaksi>,
    pub paket: Option<Paket>,
}

#[derive(Debug, Deserialize)]
pub struct DetailInput {
    pub id_transaksi: Option<i32>,
    pub id_paket: Option<i32>,
    pub qty: Option<i32>,
    pub keterangan: Option<String>,
}

pub async fn list_details(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Response> {
    ensure_role(&auth, DETAIL_LIST_ROLES).map_err(|_| ApiError::Forbidden)?;

    let rows = sqlx::query_as::<_, DetailTransaksi>(&format!(
        "SELECT {DETAIL_COLUMNS} FROM detail_transaksi ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    let transaksi = sqlx::query_as::<_, Transaksi>(
        "SELECT id, id_outlet, kode_invoice, id_member, tgl, batas_waktu, tgl_bayar, \
         biaya_tambahan, diskon, pajak, status, dibayar, id_user FROM transaksi",
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?
    .into_iter()
    .map(|t| (t.id, t))
    .collect::<std::collections::HashMap<_, _>>();

    let pakets = sqlx::query_as::<_, Paket>(
        "SELECT id, id_outlet, jenis, nama_paket, harga FROM pakets",
    )
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?
    .into_iter()
    .map(|p| (p.id, p))
    .collect::<std::collections::HashMap<_, _>>();

    let details = rows
        .into_iter()
        .map(|row| DetailWithRelations {
            transaksi: transaksi.get(&row.id_transaksi).cloned(),
            paket: pakets.get(&row.id_paket).cloned(),
            detail: row,
        })
        .collect::<Vec<_>>();

    Ok(ok("Success", details))
}

pub async fn get_detail(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, DETAIL_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let row = fetch_detail(&state, id).await?;

    let transaksi = sqlx::query_as::<_, Transaksi>(
        "SELECT id, id_outlet, kode_invoice, id_member, tgl, batas_waktu, tgl_bayar, \
         biaya_tambahan, diskon, pajak, status, dibayar, id_user FROM transaksi WHERE id = $1",
    )
    .bind(row.id_transaksi)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let paket = sqlx::query_as::<_, Paket>(
        "SELECT id, id_outlet, jenis, nama_paket, harga FROM pakets WHERE id = $1",
    )
    .bind(row.id_paket)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?;

    let detail = DetailWithRelations {
        detail: row,
        transaksi,
        paket,
    };

    Ok(ok("Success", detail))
}

pub async fn create_detail(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<DetailInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, DETAIL_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut v = FieldErrors::new();
    let id_transaksi = v.require_positive_i32("id_transaksi", input.id_transaksi);
    let id_paket = v.require_positive_i32("id_paket", input.id_paket);
    let qty = v.require_non_negative_i32("qty", input.qty);
    let keterangan = v.require_str("keterangan", input.keterangan.as_deref(), 1, 255);
    v.finish()?;

    let detail = sqlx::query_as::<_, DetailTransaksi>(&format!(
        "INSERT INTO detail_transaksi (id_transaksi, id_paket, qty, keterangan)
         VALUES ($1, $2, $3, $4)
         RETURNING {DETAIL_COLUMNS}"
    ))
    .bind(id_transaksi)
    .bind(id_paket)
    .bind(qty)
    .bind(&keterangan)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(created("Detail Transaction created successfully", detail))
}

pub async fn update_detail(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<DetailInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, DETAIL_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_detail(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(id_transaksi) = input.id_transaksi {
        v.positive_i32("id_transaksi", id_transaksi);
    }
    if let Some(id_paket) = input.id_paket {
        v.positive_i32("id_paket", id_paket);
    }
    if let Some(qty) = input.qty {
        v.non_negative_i32("qty", qty);
    }
    if let Some(keterangan) = input.keterangan.as_deref() {
        v.str_len("keterangan", keterangan, 1, 255);
    }
    v.finish()?;

    let id_transaksi = input.id_transaksi.unwrap_or(existing.id_transaksi);
    let id_paket = input.id_paket.unwrap_or(existing.id_paket);
    let qty = input.qty.unwrap_or(existing.qty);
    let keterangan = input.keterangan.unwrap_or(existing.keterangan);

    let detail = sqlx::query_as::<_, DetailTransaksi>(&format!(
        "UPDATE detail_transaksi SET id_transaksi = $1, id_paket = $2, qty = $3, keterangan = $4
         WHERE id = $5 RETURNING {DETAIL_COLUMNS}"
    ))
    .bind(id_transaksi)
    .bind(id_paket)
    .bind(qty)
    .bind(&keterangan)
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Detail Transaction updated successfully", detail))
}

pub async fn delete_detail(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, DETAIL_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let result = sqlx::query("DELETE FROM detail_transaksi WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(db_internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Detail Transaction not found"));
    }

    Ok(ok_message("Detail Transaction deleted successfully"))
}

pub(crate) async fn fetch_detail(state: &AppState, id: i32) -> ApiResult<DetailTransaksi> {
    sqlx::query_as::<_, DetailTransaksi>(&format!(
        "SELECT {DETAIL_COLUMNS} FROM detail_transaksi WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?
    .ok_or_else(|| ApiError::not_found("Detail Transaction not found"))
}

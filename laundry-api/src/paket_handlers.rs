use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use common_auth::{ensure_role, AuthContext, ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER};
use common_http_errors::{created, ok, ok_message, ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::app::{db_internal, AppState};
use crate::outlet_handlers::{load_outlets_by_id, Outlet};
use crate::validation::FieldErrors;

pub const PAKET_LIST_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR, ROLE_OWNER];
pub const PAKET_MANAGE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_KASIR];

pub const PAKET_JENIS: &[&str] = &["kiloan", "selimut", "bed_cover", "kaos", "lain"];

const PAKET_COLUMNS: &str = "id, id_outlet, jenis, nama_paket, harga";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Paket {
    pub id: i32,
    pub id_outlet: i32,
    pub jenis: String,
    pub nama_paket: String,
    pub harga: i64,
}

#[derive(Debug, Serialize)]
pub struct PaketWithOutlet {
    #[serde(flatten)]
    pub paket: Paket,
    pub outlets: Option<Outlet>,
}

#[derive(Debug, Deserialize)]
pub struct PaketInput {
    pub id_outlet: Option<i32>,
    pub jenis: Option<String>,
    pub nama_paket: Option<String>,
    pub harga: Option<i64>,
}

pub async fn list_pakets(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Response> {
    ensure_role(&auth, PAKET_LIST_ROLES).map_err(|_| ApiError::Forbidden)?;

    let pakets = sqlx::query_as::<_, Paket>(&format!(
        "SELECT {PAKET_COLUMNS} FROM pakets ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(db_internal)?;

    let outlets = load_outlets_by_id(&state).await?;
    let pakets = pakets
        .into_iter()
        .map(|paket| {
            let outlet = outlets.get(&paket.id_outlet).cloned();
            PaketWithOutlet {
                paket,
                outlets: outlet,
            }
        })
        .collect::<Vec<_>>();

    Ok(ok("Success", pakets))
}

pub async fn get_paket(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, PAKET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let paket = fetch_paket(&state, id).await?;
    Ok(ok("Success", paket))
}

pub async fn create_paket(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(input): Json<PaketInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, PAKET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let mut v = FieldErrors::new();
    let id_outlet = v.require_positive_i32("id_outlet", input.id_outlet);
    let jenis = v.require_one_of("jenis", input.jenis.as_deref(), PAKET_JENIS);
    let nama_paket = v.require_str("nama_paket", input.nama_paket.as_deref(), 1, 100);
    let harga = v.require_positive_i64("harga", input.harga);
    v.finish()?;

    let paket = sqlx::query_as::<_, Paket>(&format!(
        "INSERT INTO pakets (id_outlet, jenis, nama_paket, harga)
         VALUES ($1, $2, $3, $4)
         RETURNING {PAKET_COLUMNS}"
    ))
    .bind(id_outlet)
    .bind(&jenis)
    .bind(&nama_paket)
    .bind(harga)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(created("Paket created successfully", paket))
}

pub async fn update_paket(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(input): Json<PaketInput>,
) -> ApiResult<Response> {
    ensure_role(&auth, PAKET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let existing = fetch_paket(&state, id).await?;

    let mut v = FieldErrors::new();
    if let Some(id_outlet) = input.id_outlet {
        v.positive_i32("id_outlet", id_outlet);
    }
    if let Some(jenis) = input.jenis.as_deref() {
        v.one_of("jenis", jenis, PAKET_JENIS);
    }
    if let Some(nama_paket) = input.nama_paket.as_deref() {
        v.str_len("nama_paket", nama_paket, 1, 100);
    }
    if let Some(harga) = input.harga {
        v.positive_i64("harga", harga);
    }
    v.finish()?;

    let id_outlet = input.id_outlet.unwrap_or(existing.id_outlet);
    let jenis = input.jenis.unwrap_or(existing.jenis);
    let nama_paket = input.nama_paket.unwrap_or(existing.nama_paket);
    let harga = input.harga.unwrap_or(existing.harga);

    let paket = sqlx::query_as::<_, Paket>(&format!(
        "UPDATE pakets SET id_outlet = $1, jenis = $2, nama_paket = $3, harga = $4
         WHERE id = $5 RETURNING {PAKET_COLUMNS}"
    ))
    .bind(id_outlet)
    .bind(&jenis)
    .bind(&nama_paket)
    .bind(harga)
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_internal)?;

    Ok(ok("Paket updated successfully", paket))
}

pub async fn delete_paket(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    ensure_role(&auth, PAKET_MANAGE_ROLES).map_err(|_| ApiError::Forbidden)?;

    let result = sqlx::query("DELETE FROM pakets WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(db_internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Paket not found"));
    }

    Ok(ok_message("Paket deleted successfully"))
}

pub(crate) async fn fetch_paket(state: &AppState, id: i32) -> ApiResult<Paket> {
    sqlx::query_as::<_, Paket>(&format!(
        "SELECT {PAKET_COLUMNS} FROM pakets WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_internal)?
    .ok_or_else(|| ApiError::not_found("Paket not found"))
}

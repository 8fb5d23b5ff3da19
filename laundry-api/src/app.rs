use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use axum::routing::get;
use axum::{middleware, routing::post, Router};
use common_auth::JwtVerifier;
use common_http_errors::ApiError;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth_handlers::{login, logout, me, register};
use crate::config::AppConfig;
use crate::dashboard_handlers::get_dashboard;
use crate::detail_handlers::{
    create_detail, delete_detail, get_detail, list_details, update_detail,
};
use crate::member_handlers::{
    create_member, delete_member, get_member, list_members, update_member,
};
use crate::metrics::{render_metrics, track_http_errors};
use crate::outlet_handlers::{
    create_outlet, delete_outlet, get_outlet, list_outlets, update_outlet,
};
use crate::paket_handlers::{create_paket, delete_paket, get_paket, list_pakets, update_paket};
use crate::tokens::TokenSigner;
use crate::transaksi_handlers::{
    create_transaksi, delete_transaksi, get_transaksi, list_transaksi, update_transaksi,
};
use crate::user_handlers::{create_user, delete_user, get_user, list_users, update_user};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub token_signer: Arc<TokenSigner>,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<TokenSigner> {
    fn from_ref(state: &AppState) -> Self {
        state.token_signer.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

/// All API routes under `/api`, plus the liveness and metrics surface.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/outlets", get(list_outlets).post(create_outlet))
        .route(
            "/outlets/:id",
            get(get_outlet).put(update_outlet).delete(delete_outlet),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/pakets", get(list_pakets).post(create_paket))
        .route(
            "/pakets/:id",
            get(get_paket).put(update_paket).delete(delete_paket),
        )
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/transaksi", get(list_transaksi).post(create_transaksi))
        .route(
            "/transaksi/:id",
            get(get_transaksi)
                .put(update_transaksi)
                .delete(delete_transaksi),
        )
        .route("/details", get(list_details).post(create_detail))
        .route(
            "/details/:id",
            get(get_detail).put(update_detail).delete(delete_detail),
        )
        .route("/dashboard", get(get_dashboard));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("authorization"),
        ]);

    Router::new()
        .route("/healthz", get(health))
        .nest("/api", api)
        .route("/metrics", get(render_metrics))
        .with_state(state)
        .layer(middleware::from_fn(track_http_errors))
        .layer(cors)
}

pub(crate) fn db_internal(err: sqlx::Error) -> ApiError {
    ApiError::internal(format!("DB error: {err}"))
}

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use common_auth::JwtVerifier;
use laundry_api::app::{router, AppState};
use laundry_api::config::load_app_config;
use laundry_api::tokens::TokenSigner;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = load_app_config()?;
    let db_pool = PgPool::connect(&config.database_url).await?;

    let jwt_verifier = Arc::new(JwtVerifier::new(&config.jwt));
    let token_signer = Arc::new(TokenSigner::new(&config.jwt));

    let host = config.host.clone();
    let port = config.port;

    let state = AppState {
        db: db_pool,
        jwt_verifier,
        token_signer,
        config: Arc::new(config),
    };

    let app = router(state);

    for prefix in [
        "/api/register",
        "/api/login",
        "/api/logout",
        "/api/me",
        "/api/outlets",
        "/api/users",
        "/api/pakets",
        "/api/members",
        "/api/transaksi",
        "/api/details",
        "/api/dashboard",
    ] {
        info!(route = prefix, "Registered route");
    }

    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));

    println!("starting laundry-api on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

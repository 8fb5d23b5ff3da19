use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common_auth::{JwtConfig, JwtVerifier};
use http_body_util::BodyExt;
use laundry_api::app::{router, AppState};
use laundry_api::config::AppConfig;
use laundry_api::tokens::TokenSigner;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub struct TestContext {
    pub app: Router,
    pub pool: PgPool,
}

/// Connects to the database named by DATABASE_URL, runs migrations and resets
/// all tables. Returns `None` (skip) when no database is configured.
pub async fn bootstrap() -> Result<Option<TestContext>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };

    let pool = PgPool::connect(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    sqlx::query(
        "TRUNCATE detail_transaksi, transaksi, pakets, users, members, outlets RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    let jwt = JwtConfig::new("integration-test-secret");
    let config = AppConfig {
        database_url,
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt: jwt.clone(),
    };

    let state = AppState {
        db: pool.clone(),
        jwt_verifier: Arc::new(JwtVerifier::new(&jwt)),
        token_signer: Arc::new(TokenSigner::new(&jwt)),
        config: Arc::new(config),
    };

    Ok(Some(TestContext {
        app: router(state),
        pool,
    }))
}

/// Inserts an outlet directly; registration needs one to reference.
pub async fn seed_outlet(pool: &PgPool, nama: &str) -> Result<i32> {
    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO outlets (nama, alamat, tlp) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(nama)
    .bind("Jl. Test 1")
    .bind(81234567890_i64)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Drives one request through the full router (middleware included) and
/// returns status plus the decoded JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Ok((status, json))
}

pub async fn login_token(app: &Router, username: &str, password: &str) -> Result<String> {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
    let token = body["data"]["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("login response missing token: {body}"))?;
    Ok(token.to_string())
}

use anyhow::{Context, Result};
use std::env;

use common_auth::JwtConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

pub fn load_app_config() -> Result<AppConfig> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

    let mut jwt = JwtConfig::new(secret);
    if let Some(ttl) = i64_from_env("TOKEN_TTL_SECONDS") {
        jwt = jwt.with_ttl(ttl);
    }
    if let Some(leeway) = i64_from_env("TOKEN_LEEWAY_SECONDS") {
        jwt = jwt.with_leeway(leeway.max(0) as u64);
    }

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    Ok(AppConfig {
        database_url,
        host,
        port,
        jwt,
    })
}

fn i64_from_env(key: &str) -> Option<i64> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_from_env_parses() {
        std::env::set_var("TEST_TTL_OK", "7200");
        std::env::set_var("TEST_TTL_BAD", "soon");
        assert_eq!(i64_from_env("TEST_TTL_OK"), Some(7200));
        assert_eq!(i64_from_env("TEST_TTL_BAD"), None);
        assert_eq!(i64_from_env("TEST_TTL_UNSET"), None);
    }
}

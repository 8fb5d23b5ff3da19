use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use common_auth::JwtConfig;

/// Identity embedded in an issued session token.
pub struct TokenSubject {
    pub id: i32,
    pub nama: String,
    pub username: String,
    pub role: String,
}

pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Signs session tokens with the configured process secret.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    ttl_seconds: i64,
}

impl TokenSigner {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            ttl_seconds: config.ttl_seconds,
        }
    }

    pub fn issue(&self, subject: &TokenSubject) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_seconds);

        let claims = SessionClaims {
            id: subject.id,
            nama: &subject.nama,
            username: &subject.username,
            role: &subject.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| anyhow!("Failed to sign session token: {err}"))?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
            expires_in: self.ttl_seconds,
        })
    }
}

#[derive(Serialize)]
struct SessionClaims<'a> {
    id: i32,
    nama: &'a str,
    username: &'a str,
    role: &'a str,
    iat: i64,
    exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_auth::JwtVerifier;

    fn subject() -> TokenSubject {
        TokenSubject {
            id: 1,
            nama: "Admin".to_string(),
            username: "admin".to_string(),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn issued_token_verifies_and_round_trips_role() {
        let config = JwtConfig::new("test-secret");
        let signer = TokenSigner::new(&config);
        let verifier = JwtVerifier::new(&config);

        let issued = signer.issue(&subject()).expect("issue");
        let claims = verifier.verify(&issued.token).expect("verify");

        assert_eq!(claims.id, 1);
        assert_eq!(claims.nama, "Admin");
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn expiry_is_exactly_one_ttl_after_issuance() {
        let config = JwtConfig::new("test-secret");
        let signer = TokenSigner::new(&config);

        let issued = signer.issue(&subject()).expect("issue");
        assert_eq!(
            (issued.expires_at - issued.issued_at).num_seconds(),
            3600
        );
        assert_eq!(issued.expires_in, 3600);
    }

    #[test]
    fn token_signed_with_other_secret_fails_verification() {
        let signer = TokenSigner::new(&JwtConfig::new("secret-a"));
        let verifier = JwtVerifier::new(&JwtConfig::new("secret-b"));

        let issued = signer.issue(&subject()).expect("issue");
        assert!(verifier.verify(&issued.token).is_err());
    }
}

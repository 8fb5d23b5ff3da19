use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::claims::{Claims, ClaimsRepr};
use crate::config::JwtConfig;
use crate::error::AuthResult;

/// Verifies HS256 session tokens against the configured secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let token_data = decode::<ClaimsRepr>(token, &self.decoding_key, &self.validation)?;
        let claims = Claims::try_from(token_data.claims)?;
        debug!(username = %claims.username, "verified session token");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn sign(secret: &str, repr: &ClaimsRepr) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            repr,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign token")
    }

    fn repr_with_exp(exp_offset_seconds: i64) -> ClaimsRepr {
        let now = Utc::now().timestamp();
        ClaimsRepr {
            id: 1,
            nama: "Admin".to_string(),
            username: "admin".to_string(),
            role: "admin".to_string(),
            iat: now,
            exp: now + exp_offset_seconds,
        }
    }

    #[test]
    fn verifier_accepts_valid_token() {
        let config = JwtConfig::new("test-secret");
        let verifier = JwtVerifier::new(&config);

        let token = sign("test-secret", &repr_with_exp(3600));
        let claims = verifier.verify(&token).expect("verification succeeds");

        assert_eq!(claims.id, 1);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn verifier_rejects_wrong_secret() {
        let config = JwtConfig::new("right-secret");
        let verifier = JwtVerifier::new(&config);

        let token = sign("wrong-secret", &repr_with_exp(3600));
        let err = verifier.verify(&token).expect_err("should reject");
        assert!(matches!(err, AuthError::Verification(_)));
    }

    #[test]
    fn verifier_rejects_expired_token() {
        let config = JwtConfig::new("test-secret").with_leeway(0);
        let verifier = JwtVerifier::new(&config);

        let token = sign("test-secret", &repr_with_exp(-120));
        let err = verifier.verify(&token).expect_err("should reject");
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn verifier_accepts_not_yet_expired_token() {
        let config = JwtConfig::new("test-secret").with_leeway(0);
        let verifier = JwtVerifier::new(&config);

        let token = sign("test-secret", &repr_with_exp(5));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn verifier_rejects_garbage() {
        let config = JwtConfig::new("test-secret");
        let verifier = JwtVerifier::new(&config);

        let err = verifier
            .verify("not.a.token")
            .expect_err("should reject malformed payload");
        assert!(matches!(
            err,
            AuthError::Verification(_) | AuthError::InvalidJson(_)
        ));
    }
}

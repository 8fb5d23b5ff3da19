use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Application-focused representation of verified session-token claims.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub id: i32,
    pub nama: String,
    pub username: String,
    pub role: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Convenience helper for role checks.
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Wire shape of the signed payload.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    pub id: i32,
    pub nama: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let issued_at = Utc
            .timestamp_opt(value.iat, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("iat", value.iat.to_string()))?;

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        Ok(Self {
            id: value.id,
            nama: value.nama,
            username: value.username,
            role: value.role,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_converts_timestamps() {
        let repr = ClaimsRepr {
            id: 7,
            nama: "Admin".to_string(),
            username: "admin".to_string(),
            role: "admin".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };

        let claims = Claims::try_from(repr).expect("conversion");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.role, "admin");
        assert_eq!(
            (claims.expires_at - claims.issued_at).num_seconds(),
            3600
        );
    }
}

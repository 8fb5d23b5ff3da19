/// Runtime configuration for session-token signing and verification.
///
/// The secret is always injected at construction so environments (and tests)
/// can run with distinct keys.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 signing secret.
    pub secret: String,
    /// Lifetime of issued tokens in seconds.
    pub ttl_seconds: i64,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u64,
}

impl JwtConfig {
    /// Construct config with the default one-hour lifetime and 30 second leeway.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds: 3600,
            leeway_seconds: 30,
        }
    }

    /// Adjust the token lifetime.
    pub fn with_ttl(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

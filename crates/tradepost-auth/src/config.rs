// Authentication configuration loaded from environment variables.
// Decision: a missing secret gets a random per-process value so a forgotten
// AUTH_JWT_SECRET fails closed across restarts instead of defaulting to a
// well-known string.

use std::time::Duration;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens. Held by the gateway process only.
    pub secret: String,
    /// Validity window of issued tokens.
    pub token_lifetime: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_lifetime: Duration::from_secs(24 * 60 * 60), // 24 hours
        }
    }
}

/// Complete authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    /// Budget for a single revocation-store lookup; on expiry the request is
    /// treated as unauthenticated (fail closed).
    pub revocation_timeout: Duration,
    /// How often expired revocation records are swept.
    pub sweep_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            revocation_timeout: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60 * 60), // hourly
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let secret = std::env::var("AUTH_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "AUTH_JWT_SECRET not set, generating a random secret; issued tokens will not survive a restart"
            );
            use rand::Rng;
            let bytes: [u8; 32] = rand::thread_rng().gen();
            hex::encode(bytes)
        });

        let token_lifetime = std::env::var("AUTH_JWT_TOKEN_LIFETIME")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(24 * 60 * 60));

        let revocation_timeout = std::env::var("AUTH_REVOCATION_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_secs(2));

        let sweep_interval = std::env::var("AUTH_REVOCATION_SWEEP_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60 * 60));

        Self {
            jwt: JwtConfig {
                secret,
                token_lifetime,
            },
            revocation_timeout,
            sweep_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt.token_lifetime, Duration::from_secs(86400));
        assert_eq!(config.revocation_timeout, Duration::from_secs(2));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }
}

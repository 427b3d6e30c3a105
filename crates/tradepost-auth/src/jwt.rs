// JWT token codec.
// Decision: HS256 with a single shared secret, held by the gateway process
// only; internal services consume propagated identity headers and never see
// the key.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradepost_core::Role;

use crate::config::JwtConfig;

/// Claims carried by an identity token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user email).
    pub sub: String,
    /// Account role.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Why a token was not accepted. Expiry is distinguished from tampering for
/// logging; callers map both to the same external response.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature or payload")]
    Invalid,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Token issue/verify service. Pure function of the configured secret; no
/// side effects beyond signing.
#[derive(Clone)]
pub struct TokenService {
    lifetime_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            lifetime_secs: config.token_lifetime.as_secs() as i64,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    /// Issue a signed token for a subject with the configured validity window.
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            iat: now,
            exp: now + self.lifetime_secs,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(TokenError::Signing)
    }

    /// Verify signature and expiry, returning the claims. Tokens signed with
    /// a different key and tampered payloads are `Invalid`; an otherwise
    /// well-formed token past its expiry is `Expired`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Token lifetime in seconds, for `expires_in` style responses.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }
}

/// Hash a token for revocation-store keys (SHA-256, hex). The store never
/// holds raw tokens.
pub fn token_hash(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            token_lifetime: Duration::from_secs(900),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let service = TokenService::new(&test_config());
        let token = service.issue("shop@tradepost.io", Role::Seller).unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "shop@tradepost.io");
        assert_eq!(claims.role, Role::Seller);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let service = TokenService::new(&test_config());
        assert!(matches!(
            service.verify("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let service = TokenService::new(&test_config());
        let other = TokenService::new(&JwtConfig {
            secret: "a-different-secret".to_string(),
            token_lifetime: Duration::from_secs(900),
        });

        // Claim content does not matter; the signature does.
        for (subject, role) in [
            ("shop@tradepost.io", Role::Seller),
            ("root@tradepost.io", Role::Admin),
        ] {
            let token = other.issue(subject, role).unwrap();
            assert!(matches!(service.verify(&token), Err(TokenError::Invalid)));
        }
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new(&test_config());

        // Hand-craft an expiry comfortably past the default validation leeway.
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "shop@tradepost.io".to_string(),
            role: Role::Seller,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(test_config().secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = TokenService::new(&test_config());
        let token = service.issue("shop@tradepost.io", Role::Client).unwrap();

        // Swap out the payload segment while keeping the original signature.
        let mut parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let forged = service.issue("shop@tradepost.io", Role::Admin).unwrap();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let tampered = parts.join(".");

        assert!(matches!(service.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_token_hash() {
        let hash1 = token_hash("some-token");
        let hash2 = token_hash("some-token");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, token_hash("other-token"));

        // SHA-256 produces 64 hex characters.
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

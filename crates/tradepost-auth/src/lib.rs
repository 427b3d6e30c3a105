// The authentication core shared by the gateway and the internal services.
// Decision: one authoritative decision filter with explicit trust modes,
// instead of per-service filter copies that drift apart.

pub mod config;
pub mod filter;
pub mod jwt;
pub mod revocation;

pub use config::{AuthConfig, JwtConfig};
pub use filter::{authenticate, AuthError, AuthFilter, VerifiedToken, TOKEN_COOKIE};
pub use jwt::{token_hash, TokenClaims, TokenError, TokenService};
pub use revocation::{spawn_sweeper, RevocationError, RevocationStore};

// The authentication decision filter.
//
// One filter runs once per inbound request at the edge and at every internal
// service; the trust mode decides where identity comes from. Terminal states
// per request: ALLOW (forward, principal in request extensions when one was
// established) or REJECT (the response is written and the request goes no
// further).
//
// Edge mode order of checks, in this order on purpose:
//   classify route -> extract credential -> revocation check -> verify
//   signature -> establish principal -> role check.
// Revocation runs before signature verification so an already-invalidated
// token learns nothing about its own validity, and a revoked-token rejection
// costs no signature work.

use axum::{
    extract::{Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use std::time::Duration;
use tradepost_core::policy::{self, Visibility};
use tradepost_core::{trust, Principal};

use crate::jwt::{token_hash, TokenClaims, TokenError, TokenService};
use crate::revocation::RevocationStore;

/// Cookie carrying the token for browser clients, checked after the
/// Authorization header.
pub const TOKEN_COOKIE: &str = "jwt";

/// Authentication/authorization failure, rendered as a JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::FORBIDDEN,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Raw credential plus its verified claims, kept for token-lifecycle
/// endpoints (logout needs the expiry to bound the revocation record).
/// Inserted by the edge filter; never re-verified mid-request.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub raw: String,
    pub claims: TokenClaims,
}

/// Outcome of an allowed request.
#[derive(Debug, Default)]
pub struct Admission {
    pub principal: Option<Principal>,
    pub token: Option<VerifiedToken>,
}

/// The decision filter. `Edge` verifies bearer/cookie tokens against the
/// codec and the revocation store; `Internal` trusts the identity headers
/// stamped by the gateway and never sees the signing secret.
#[derive(Clone)]
pub enum AuthFilter {
    Edge {
        tokens: TokenService,
        revocation: RevocationStore,
        revocation_timeout: Duration,
    },
    Internal,
}

impl AuthFilter {
    pub fn edge(
        tokens: TokenService,
        revocation: RevocationStore,
        revocation_timeout: Duration,
    ) -> Self {
        Self::Edge {
            tokens,
            revocation,
            revocation_timeout,
        }
    }

    /// Run the per-request state machine against the request head.
    pub async fn check(&self, parts: &Parts) -> Result<Admission, AuthError> {
        let method = &parts.method;
        let path = parts.uri.path();

        match policy::visibility(method, path) {
            Visibility::Public => return Ok(Admission::default()),
            Visibility::Internal => match self {
                // Internal-only endpoints do not exist as far as the outside
                // world is concerned.
                AuthFilter::Edge { .. } => {
                    tracing::debug!(%method, path, "internal-only route refused at the edge");
                    return Err(AuthError::not_found("Not found"));
                }
                // Inside the boundary these run with system-level trust.
                AuthFilter::Internal => return Ok(Admission::default()),
            },
            Visibility::Protected => {}
        }

        let (principal, token) = match self {
            AuthFilter::Edge {
                tokens,
                revocation,
                revocation_timeout,
            } => {
                let raw = extract_token(parts)
                    .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;

                check_revocation(revocation, *revocation_timeout, &raw, path).await?;

                let claims = tokens.verify(&raw).map_err(|e| {
                    match e {
                        TokenError::Expired => tracing::debug!(path, "rejected expired token"),
                        _ => tracing::debug!(path, error = %e, "token verification failed"),
                    }
                    AuthError::unauthorized("Invalid or expired token")
                })?;

                let principal = Principal::new(claims.sub.clone(), claims.role);
                (principal, Some(VerifiedToken { raw, claims }))
            }
            AuthFilter::Internal => {
                let principal = trust::extract(&parts.headers)
                    .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;
                (principal, None)
            }
        };

        // Authorization is a separate outcome from authentication: a valid
        // identity with the wrong role is 403, never 401.
        let requirement = policy::required_roles(method, path);
        if !requirement.allows(principal.role) {
            tracing::debug!(
                subject = %principal.subject,
                role = %principal.role,
                %method,
                path,
                "insufficient role"
            );
            return Err(AuthError::forbidden("Insufficient permissions"));
        }

        Ok(Admission {
            principal: Some(principal),
            token,
        })
    }
}

/// Revocation lookup with a fail-closed budget: a store error or timeout is
/// treated as "unauthenticated", never as "not revoked".
async fn check_revocation(
    revocation: &RevocationStore,
    timeout: Duration,
    raw_token: &str,
    path: &str,
) -> Result<(), AuthError> {
    let hash = token_hash(raw_token);
    match tokio::time::timeout(timeout, revocation.is_revoked(&hash)).await {
        Ok(Ok(false)) => Ok(()),
        Ok(Ok(true)) => {
            // Externally identical to any other invalid token; the
            // distinction lives in this log line only.
            tracing::debug!(path, "rejected revoked token");
            Err(AuthError::unauthorized("Invalid or expired token"))
        }
        Ok(Err(e)) => {
            tracing::warn!(path, error = %e, "revocation store unavailable, failing closed");
            Err(AuthError::unauthorized("Invalid or expired token"))
        }
        Err(_) => {
            tracing::warn!(path, "revocation check timed out, failing closed");
            Err(AuthError::unauthorized("Invalid or expired token"))
        }
    }
}

/// Bearer token from the Authorization header, falling back to the cookie.
pub fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        if let Ok(s) = value.to_str() {
            if let Some(token) = s.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Axum middleware wrapping the filter. Attach with
/// `axum::middleware::from_fn_with_state(filter, authenticate)`.
pub async fn authenticate(State(filter): State<AuthFilter>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    // The edge never trusts identity headers arriving from the outside.
    if matches!(filter, AuthFilter::Edge { .. }) {
        trust::strip(&mut parts.headers);
    }

    match filter.check(&parts).await {
        Ok(admission) => {
            if let Some(principal) = admission.principal {
                parts.extensions.insert(principal);
            }
            if let Some(token) = admission.token {
                parts.extensions.insert(token);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request as HttpRequest},
        middleware::from_fn_with_state,
        Router,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;
    use tower::ServiceExt;
    use tradepost_core::Role;

    use crate::config::JwtConfig;

    fn token_service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "filter-test-secret".to_string(),
            token_lifetime: Duration::from_secs(900),
        })
    }

    fn edge_app(revocation: RevocationStore) -> Router {
        let filter = AuthFilter::edge(token_service(), revocation, Duration::from_secs(2));
        echo_app(filter)
    }

    fn internal_app() -> Router {
        echo_app(AuthFilter::Internal)
    }

    /// Every route answers 200 with the established subject (or "-"), so the
    /// response tells us both the decision and the identity that crossed it.
    fn echo_app(filter: AuthFilter) -> Router {
        Router::new()
            .fallback(|request: Request| async move {
                request
                    .extensions()
                    .get::<Principal>()
                    .map(|p| p.subject.clone())
                    .unwrap_or_else(|| "-".to_string())
            })
            .layer(from_fn_with_state(filter, authenticate))
    }

    async fn send(app: &Router, request: HttpRequest<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    fn req(method: Method, path: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    fn authed(method: Method, path: &str, token: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_public_routes_allowed_without_identity() {
        let app = edge_app(RevocationStore::in_memory());

        for (method, path) in [
            (Method::GET, "/products"),
            (Method::GET, "/products/abc123"),
            (Method::GET, "/media/file/xyz"),
            (Method::GET, "/health"),
        ] {
            let (status, body) = send(&app, req(method.clone(), path)).await;
            assert_eq!(status, StatusCode::OK, "{method} {path}");
            assert_eq!(body, "-", "{method} {path} should carry no identity");
        }
    }

    #[tokio::test]
    async fn test_protected_route_without_credential() {
        let app = edge_app(RevocationStore::in_memory());

        let (status, _) = send(&app, req(Method::POST, "/products")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, req(Method::GET, "/products/my-products")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, req(Method::DELETE, "/media/xyz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_establishes_principal() {
        let app = edge_app(RevocationStore::in_memory());
        let token = token_service().issue("shop@tradepost.io", Role::Seller).unwrap();

        let (status, body) = send(&app, authed(Method::POST, "/products", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "shop@tradepost.io");
    }

    #[tokio::test]
    async fn test_cookie_credential_fallback() {
        let app = edge_app(RevocationStore::in_memory());
        let token = token_service().issue("shop@tradepost.io", Role::Seller).unwrap();

        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/products/my-products")
            .header(header::COOKIE, format!("{TOKEN_COOKIE}={token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "shop@tradepost.io");
    }

    #[tokio::test]
    async fn test_tampered_and_foreign_tokens_rejected() {
        let app = edge_app(RevocationStore::in_memory());

        let foreign = TokenService::new(&JwtConfig {
            secret: "somebody-elses-secret".to_string(),
            token_lifetime: Duration::from_secs(900),
        })
        .issue("shop@tradepost.io", Role::Admin)
        .unwrap();

        let (status, _) = send(&app, authed(Method::POST, "/products", &foreign)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, authed(Method::POST, "/products", "garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revoked_token_rejected_despite_valid_signature() {
        let revocation = RevocationStore::in_memory();
        let app = edge_app(revocation.clone());
        let token = token_service().issue("shop@tradepost.io", Role::Seller).unwrap();

        // Sanity: the token works before revocation.
        let (status, _) = send(&app, authed(Method::POST, "/products", &token)).await;
        assert_eq!(status, StatusCode::OK);

        revocation
            .revoke(&token_hash(&token), Utc::now() + ChronoDuration::minutes(15))
            .await
            .unwrap();

        let (status, _) = send(&app, authed(Method::POST, "/products", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_insufficient_role_is_forbidden_not_unauthorized() {
        let app = edge_app(RevocationStore::in_memory());
        let client = token_service().issue("buyer@tradepost.io", Role::Client).unwrap();

        // Authenticated but the role table says seller/admin.
        let (status, _) = send(&app, authed(Method::POST, "/products", &client)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // The same credential is fine where any identity is enough.
        let (status, _) = send(&app, authed(Method::GET, "/products/my-products", &client)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_internal_routes_refused_at_edge_even_with_admin_token() {
        let app = edge_app(RevocationStore::in_memory());
        let admin = token_service().issue("root@tradepost.io", Role::Admin).unwrap();

        let (status, _) = send(&app, authed(Method::DELETE, "/products/user/u1", &admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, req(Method::GET, "/products/user/u1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edge_strips_forged_identity_headers() {
        let app = edge_app(RevocationStore::in_memory());

        // Forged identity headers with no token must not authenticate...
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/products/my-products")
            .header(trust::USER_EMAIL_HEADER, "root@tradepost.io")
            .header(trust::USER_ROLE_HEADER, "admin")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // ...and must not survive into the request a real token authorizes.
        let token = token_service().issue("buyer@tradepost.io", Role::Client).unwrap();
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/products/my-products")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(trust::USER_EMAIL_HEADER, "root@tradepost.io")
            .header(trust::USER_ROLE_HEADER, "admin")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "buyer@tradepost.io");
    }

    #[tokio::test]
    async fn test_internal_mode_trusts_propagated_headers() {
        let app = internal_app();

        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/products/my-products")
            .header(trust::USER_EMAIL_HEADER, "shop@tradepost.io")
            .header(trust::USER_ROLE_HEADER, "seller")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "shop@tradepost.io");

        // Role checks still apply to propagated identity.
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/products")
            .header(trust::USER_EMAIL_HEADER, "buyer@tradepost.io")
            .header(trust::USER_ROLE_HEADER, "client")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_internal_mode_admits_internal_routes_with_system_trust() {
        let app = internal_app();

        let (status, body) = send(&app, req(Method::DELETE, "/products/user/u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "-");

        // A bearer token means nothing here: internal services hold no
        // secret, so a protected route without propagated headers is 401.
        let token = token_service().issue("shop@tradepost.io", Role::Seller).unwrap();
        let (status, _) = send(&app, authed(Method::POST, "/products", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

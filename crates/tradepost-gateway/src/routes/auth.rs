// Token lifecycle HTTP routes.
// Decision: login/register answer with both a bearer token and an http-only
// cookie so API clients and browsers share one code path.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradepost_auth::{token_hash, AuthError, VerifiedToken, TOKEN_COOKIE};
use tradepost_core::{Principal, Role};

use crate::storage::{password::hash_password, password::verify_password, CreateUserRow};
use crate::AppState;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register request. Role may be "client" (default) or "seller"; admin is
/// never grantable here.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Current-user response.
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

/// Auth routes served by the gateway itself (everything else is proxied).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// POST /auth/login - exchange email/password for a token.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AuthError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error during login");
            AuthError::unauthorized("Login failed")
        })?
        .ok_or_else(|| AuthError::unauthorized("Invalid email or password"))?;

    let valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
        tracing::error!(error = %e, "password verification error");
        AuthError::unauthorized("Login failed")
    })?;
    if !valid {
        return Err(AuthError::unauthorized("Invalid email or password"));
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        tracing::error!(email = %user.email, role = %user.role, "user row carries an unknown role");
        AuthError::unauthorized("Login failed")
    })?;

    token_response(&state, jar, &user.email, role)
}

/// POST /auth/register - create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>), AuthError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AuthError::bad_request("A valid email is required"));
    }
    if req.password.len() < 8 {
        return Err(AuthError::bad_request("Password must be at least 8 characters"));
    }

    let role = match req.role.as_deref() {
        None => Role::Client,
        Some(s) => match Role::parse(s) {
            Some(Role::Admin) | None => {
                return Err(AuthError::bad_request("Role must be client or seller"))
            }
            Some(role) => role,
        },
    };

    let existing = state.db.get_user_by_email(&req.email).await.map_err(|e| {
        tracing::error!(error = %e, "database error during registration");
        AuthError::unauthorized("Registration failed")
    })?;
    if existing.is_some() {
        return Err(AuthError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing error");
        AuthError::unauthorized("Registration failed")
    })?;

    let user = state
        .db
        .create_user(CreateUserRow {
            email: req.email.clone(),
            name: req.name.clone(),
            password_hash,
            role: role.as_str().to_string(),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user creation error");
            AuthError::unauthorized("Registration failed")
        })?;

    let (jar, json) = token_response(&state, jar, &user.email, role)?;
    Ok((StatusCode::CREATED, jar, json))
}

/// POST /auth/logout - revoke the presented token for its remaining
/// lifetime and clear the cookie. Idempotent: logging out twice is a no-op
/// (though the second call no longer authenticates).
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    Extension(token): Extension<VerifiedToken>,
) -> Result<(CookieJar, StatusCode), AuthError> {
    let expires_at =
        DateTime::<Utc>::from_timestamp(token.claims.exp, 0).unwrap_or_else(Utc::now);

    state
        .revocation
        .revoke(&token_hash(&token.raw), expires_at)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to record revocation");
            AuthError::unauthorized("Logout failed")
        })?;

    tracing::debug!(subject = %token.claims.sub, "token revoked on logout");

    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// GET /auth/me - identity of the calling principal.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserInfoResponse>, AuthError> {
    // Resolve the display name; the account may have been deleted since the
    // token was issued, in which case the claims still stand on their own.
    let name = state
        .db
        .get_user_by_email(&principal.subject)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database error resolving current user");
            AuthError::unauthorized("Lookup failed")
        })?
        .map(|u| u.name);

    Ok(Json(UserInfoResponse {
        email: principal.subject,
        name,
        role: principal.role,
    }))
}

/// Issue a token for the authenticated user and set the browser cookie.
fn token_response(
    state: &AppState,
    jar: CookieJar,
    email: &str,
    role: Role,
) -> Result<(CookieJar, Json<TokenResponse>), AuthError> {
    let token = state.tokens.issue(email, role).map_err(|e| {
        tracing::error!(error = %e, "token issue failed");
        AuthError::unauthorized("Login failed")
    })?;
    let expires_in = state.tokens.lifetime_secs();

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(expires_in))
        .build();

    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in,
        }),
    ))
}

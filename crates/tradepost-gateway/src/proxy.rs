// Reverse proxy from the edge to the internal services.
//
// Identity crosses the service boundary only as the trusted headers stamped
// here from the verified principal; the raw credential (Authorization
// header, token cookie) never leaves the gateway. The deployment must
// guarantee that internal service addresses are reachable from the gateway
// alone.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tradepost_auth::AuthError;
use tradepost_core::{trust, Principal};

use crate::AppState;

/// Upper bound on a proxied request body (uploads go through the media
/// service, so this is generous).
const MAX_PROXY_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Connection-scoped headers that must not be forwarded either way.
const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Prefix map from public paths to internal service base URLs.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub products: String,
    pub media: String,
    pub users: String,
}

impl Upstreams {
    pub fn route(&self, path: &str) -> Option<&str> {
        if path == "/products" || path.starts_with("/products/") {
            Some(&self.products)
        } else if path == "/media" || path.starts_with("/media/") {
            Some(&self.media)
        } else if path == "/users" || path.starts_with("/users/") {
            Some(&self.users)
        } else {
            None
        }
    }
}

/// Fallback handler: everything the gateway does not serve itself is
/// forwarded. Runs after the authentication filter, so the request carries
/// an already-verified principal (or none, for public routes).
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let Some(upstream) = state.upstreams.route(&path) else {
        return AuthError::not_found("Not found").into_response();
    };

    let url = match request.uri().query() {
        Some(query) => format!("{upstream}{path}?{query}"),
        None => format!("{upstream}{path}"),
    };

    let principal = request.extensions().get::<Principal>().cloned();
    let method = request.method().clone();
    let mut headers = request.headers().clone();
    prepare_forward_headers(&mut headers, principal.as_ref());

    let body = match to_bytes(request.into_body(), MAX_PROXY_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path, error = %e, "failed to buffer request body");
            return AuthError::bad_request("Invalid request body").into_response();
        }
    };

    let upstream_response = match state
        .http
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url, error = %e, "upstream request failed");
            return bad_gateway();
        }
    };

    let status = upstream_response.status();
    let upstream_headers = upstream_response.headers().clone();
    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(url, error = %e, "failed to read upstream response");
            return bad_gateway();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in upstream_headers.iter() {
        if !is_hop_by_hop(name) {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }
    response
}

fn prepare_forward_headers(headers: &mut HeaderMap, principal: Option<&Principal>) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
    // reqwest sets these for the upstream connection.
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    // The user credential stops at the edge.
    headers.remove(header::AUTHORIZATION);
    headers.remove(header::COOKIE);

    // Only identity the edge verified on this request may cross the
    // boundary. The filter already strips inbound copies; doing it again
    // here keeps the proxy safe even if it is ever rewired.
    trust::strip(headers);
    if let Some(principal) = principal {
        trust::inject(headers, principal);
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({ "error": "Upstream service unavailable" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_core::Role;

    fn upstreams() -> Upstreams {
        Upstreams {
            products: "http://products.internal".to_string(),
            media: "http://media.internal".to_string(),
            users: "http://users.internal".to_string(),
        }
    }

    #[test]
    fn test_route_by_prefix() {
        let map = upstreams();
        assert_eq!(map.route("/products"), Some("http://products.internal"));
        assert_eq!(map.route("/products/abc"), Some("http://products.internal"));
        assert_eq!(map.route("/media/file/x"), Some("http://media.internal"));
        assert_eq!(map.route("/users/me"), Some("http://users.internal"));
        assert_eq!(map.route("/productsx"), None);
        assert_eq!(map.route("/"), None);
        assert_eq!(map.route("/unknown"), None);
    }

    #[test]
    fn test_forward_headers_replace_credentials_with_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());
        headers.insert(header::COOKIE, "jwt=tok".parse().unwrap());
        headers.insert(header::HOST, "gateway.example".parse().unwrap());
        headers.insert(trust::USER_EMAIL_HEADER, "forged@evil.example".parse().unwrap());
        headers.insert("x-request-id", "abc123".parse().unwrap());

        let principal = Principal::new("shop@tradepost.io", Role::Seller);
        prepare_forward_headers(&mut headers, Some(&principal));

        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(headers.get(header::COOKIE).is_none());
        assert!(headers.get(header::HOST).is_none());
        assert_eq!(headers.get(trust::USER_EMAIL_HEADER).unwrap(), "shop@tradepost.io");
        assert_eq!(headers.get(trust::USER_ROLE_HEADER).unwrap(), "seller");
        // Unrelated headers pass through.
        assert_eq!(headers.get("x-request-id").unwrap(), "abc123");
    }

    #[test]
    fn test_forward_headers_anonymous_carries_no_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(trust::USER_EMAIL_HEADER, "forged@evil.example".parse().unwrap());
        headers.insert(trust::USER_ROLE_HEADER, "admin".parse().unwrap());

        prepare_forward_headers(&mut headers, None);

        assert!(headers.get(trust::USER_EMAIL_HEADER).is_none());
        assert!(headers.get(trust::USER_ROLE_HEADER).is_none());
    }
}

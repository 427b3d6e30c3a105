// Gateway configuration loaded from environment variables.

use crate::proxy::Upstreams;

/// Bootstrap admin credentials. The only way an admin account comes to
/// exist; registration can never grant the role.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// When unset the gateway runs with in-memory storage (dev mode).
    pub database_url: Option<String>,
    pub upstreams: Upstreams,
    pub admin: Option<AdminConfig>,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let listen_addr =
            std::env::var("GATEWAY_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let upstreams = Upstreams {
            products: service_url("PRODUCT_SERVICE_URL", "http://localhost:8081"),
            media: service_url("MEDIA_SERVICE_URL", "http://localhost:8082"),
            users: service_url("USER_SERVICE_URL", "http://localhost:8083"),
        };

        let admin = match (
            std::env::var("AUTH_ADMIN_EMAIL"),
            std::env::var("AUTH_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminConfig { email, password })
            }
            _ => None,
        };

        Self {
            listen_addr,
            database_url,
            upstreams,
            admin,
        }
    }
}

fn service_url(var: &str, default: &str) -> String {
    let url = std::env::var(var).unwrap_or_else(|_| default.to_string());
    // Upstream URLs are joined with the request path verbatim.
    url.trim_end_matches('/').to_string()
}

// Marketplace roles carried in the token's role claim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role. `Admin` is never grantable through registration; it only
/// exists via the bootstrap credentials at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Case-insensitive parse of the wire form ("client", "seller", "admin").
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Some(Role::Client),
            "seller" => Some(Role::Seller),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

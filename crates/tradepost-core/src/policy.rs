// Centralized route policy for the whole platform.
//
// Every rule here is a business decision about what is safe to expose
// unauthenticated, so changes to this file are security-relevant and should
// be reviewed as such. Classification is deny-by-default: anything not
// explicitly matched as public or internal-only is protected. Rules are
// method-sensitive; a path can be public for GET and protected for writes.

use crate::role::Role;
use http::Method;

/// Who may reach a route at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable without identity.
    Public,
    /// Requires a verified identity.
    Protected,
    /// Service-to-service only. The edge refuses these outright; inside the
    /// trust boundary they run with system-level trust and no principal.
    Internal,
}

/// Role requirement applied after authentication succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any verified identity is enough.
    Authenticated,
    /// Identity must carry one of the listed roles.
    AnyOf(&'static [Role]),
}

impl RoleRequirement {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            RoleRequirement::Authenticated => true,
            RoleRequirement::AnyOf(roles) => roles.contains(&role),
        }
    }
}

/// Classify a route. Evaluated once per request, before any credential work.
pub fn visibility(method: &Method, path: &str) -> Visibility {
    if is_internal(method, path) {
        Visibility::Internal
    } else if is_public(method, path) {
        Visibility::Public
    } else {
        Visibility::Protected
    }
}

/// Role table for protected routes, consulted after authentication. Kept in
/// one place instead of scattered per-handler so the route -> role mapping
/// is independently testable.
pub fn required_roles(method: &Method, path: &str) -> RoleRequirement {
    const SELLER_OR_ADMIN: &[Role] = &[Role::Seller, Role::Admin];
    const SELLER: &[Role] = &[Role::Seller];
    const ADMIN: &[Role] = &[Role::Admin];

    // Listing products is open; creating them is a seller operation.
    // Ownership of updates/deletes is checked by the catalog service itself.
    if path == "/products" && *method == Method::POST {
        return RoleRequirement::AnyOf(SELLER_OR_ADMIN);
    }

    if path == "/media" || path.starts_with("/media/") {
        // Avatar management is tied to seller profiles.
        if (path == "/media/avatar/upload" && *method == Method::POST)
            || (path == "/media/avatar" && *method == Method::DELETE)
        {
            return RoleRequirement::AnyOf(SELLER);
        }
        // Product media uploads and deletions.
        if (*method == Method::POST && path.starts_with("/media/upload/"))
            || *method == Method::DELETE
        {
            return RoleRequirement::AnyOf(SELLER_OR_ADMIN);
        }
        return RoleRequirement::Authenticated;
    }

    // User administration; /users/me stays available to the account itself.
    if path == "/users" {
        return RoleRequirement::AnyOf(ADMIN);
    }
    if let Some(rest) = path.strip_prefix("/users/") {
        if rest != "me"
            && (*method == Method::POST || *method == Method::PUT || *method == Method::DELETE)
        {
            return RoleRequirement::AnyOf(ADMIN);
        }
    }

    RoleRequirement::Authenticated
}

/// Internal-only routes: endpoints that exist for service-to-service
/// workflows (user deletion fan-out, media lookups) and must never be
/// reachable from outside the trust boundary.
fn is_internal(method: &Method, path: &str) -> bool {
    if let Some(rest) = path.strip_prefix("/products/user/") {
        return is_single_segment(rest) && (*method == Method::GET || *method == Method::DELETE);
    }
    if let Some(rest) = path.strip_prefix("/media/internal/product/") {
        return is_single_segment(rest) && *method == Method::DELETE;
    }
    if let Some(rest) = path.strip_prefix("/users/internal/avatar/") {
        return is_single_segment(rest) && *method == Method::PUT;
    }
    if let Some(rest) = path.strip_prefix("/users/email/") {
        return is_single_segment(rest) && *method == Method::GET;
    }
    false
}

fn is_public(method: &Method, path: &str) -> bool {
    // Auth endpoints, any method.
    if path == "/auth/login" || path == "/auth/register" {
        return true;
    }

    // Everything below is public for GET only.
    if *method != Method::GET {
        return false;
    }

    // Media browsing: files, product images, avatars.
    if path.starts_with("/media/file/")
        || path.starts_with("/media/product/")
        || path.starts_with("/media/avatar/file/")
        || path.starts_with("/media/avatar/user/")
    {
        return true;
    }

    // Product browsing.
    if path == "/products" {
        return true;
    }
    if let Some(id) = path.strip_prefix("/products/") {
        // A bare product id only. /products/my-products and /products/user/*
        // share the prefix but are deliberately excluded, not oversights.
        if is_single_segment(id) && id != "my-products" && !id.starts_with("user") {
            return true;
        }
    }

    // Operational health endpoint.
    if path == "/health" {
        return true;
    }

    false
}

fn is_single_segment(rest: &str) -> bool {
    !rest.is_empty() && !rest.contains('/')
}

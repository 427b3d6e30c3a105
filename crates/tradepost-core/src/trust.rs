// Trusted identity propagation between the gateway and internal services.
//
// Once the edge has authenticated a request, identity crosses the service
// boundary as these two headers instead of the raw token. Internal services
// accept them as authoritative, which is only sound if the deployment
// guarantees that nothing outside the trust boundary can reach an internal
// service directly. The edge strips inbound copies of these headers before
// doing anything else, so an outside caller can never smuggle identity
// through the gateway.

use crate::{Principal, Role};
use http::header::{HeaderMap, HeaderValue};

/// Verified subject (email), stamped by the gateway.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
/// Verified role, stamped by the gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Stamp the verified identity onto an outbound (edge -> internal) request.
pub fn inject(headers: &mut HeaderMap, principal: &Principal) {
    match HeaderValue::from_str(&principal.subject) {
        Ok(subject) => {
            headers.insert(USER_EMAIL_HEADER, subject);
            headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(principal.role.as_str()));
        }
        Err(_) => {
            // Subjects come from claims we issued; a non-ASCII subject here
            // means something upstream is broken, so forward no identity.
            tracing::warn!(subject = %principal.subject, "subject not representable as header, dropping identity");
        }
    }
}

/// Read propagated identity on the internal side. Returns `None` unless both
/// headers are present and well-formed.
pub fn extract(headers: &HeaderMap) -> Option<Principal> {
    let subject = headers.get(USER_EMAIL_HEADER)?.to_str().ok()?;
    let role = headers.get(USER_ROLE_HEADER)?.to_str().ok()?;
    let role = Role::parse(role)?;
    if subject.is_empty() {
        return None;
    }
    Some(Principal::new(subject, role))
}

/// Remove any identity headers arriving from the outside world.
pub fn strip(headers: &mut HeaderMap) {
    headers.remove(USER_EMAIL_HEADER);
    headers.remove(USER_ROLE_HEADER);
}

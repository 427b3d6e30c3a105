// Shared domain vocabulary for the tradepost platform.
// Everything the edge and the internal services must agree on lives here:
// roles, the request-scoped principal, the route policy, and the trusted
// identity header contract.

pub mod policy;
pub mod principal;
pub mod role;
pub mod telemetry;
pub mod trust;

pub use principal::Principal;
pub use role::Role;

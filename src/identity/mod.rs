//! Authenticated identity handling: principal derivation, the per-request
//! authentication pipeline and the route access policy.
//! Keep the public surface thin and split implementation across sub-modules.

mod filter;
mod policy;
mod principal;
mod provider;
mod request_context;
mod resolver;

pub use filter::{authenticate, require_authentication};
pub use policy::AccessPolicy;
pub use principal::Principal;
pub use provider::{AccountService, Credentials, LoginResponse, NewAccount};
pub use request_context::RequestContext;
pub use resolver::IdentityResolver;

use super::Principal;

/// Request-scoped security context. Built fresh by the authenticator for
/// every inbound request and carried in that request's extensions; it must
/// never outlive or be shared beyond the request it was built for.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

//! Per-request authentication pipeline.
//! Two middleware layers: `authenticate` runs first and binds a principal
//! into the request context when a valid bearer token is presented, never
//! rejecting anything itself; `require_authentication` is the policy gate
//! that turns a missing principal on a protected route into a 401.

use std::fmt::Write as _;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::error::AppError;
use crate::server::AppState;

use super::RequestContext;

fn gen_request_id() -> String {
    let mut bytes = [0u8; 8];
    let _ = getrandom::getrandom(&mut bytes);
    let mut id = String::with_capacity(16);
    for b in &bytes {
        let _ = write!(&mut id, "{:02x}", b);
    }
    id
}

/// Bearer credential from the Authorization header. Requires the exact
/// "Bearer " prefix; anything else counts as no credential offered.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

/// Optimistic authenticator. Validates an offered token, resolves the
/// subject to a principal and binds it to this request's context. Every
/// failure mode, from a malformed header to a store fault, leaves the
/// request anonymous and lets processing continue; the gate decides.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut ctx = RequestContext { principal: None, request_id: Some(gen_request_id()) };

    if let Some(token) = bearer_token(req.headers()) {
        if state.tokens.validate(&token) {
            let bound = state
                .tokens
                .subject(&token)
                .map_err(AppError::from)
                .and_then(|username| state.resolver.resolve(&username));
            match bound {
                Ok(principal) => {
                    debug!(
                        "authenticated user={} request_id={}",
                        principal.username,
                        ctx.request_id.as_deref().unwrap_or("-")
                    );
                    ctx.principal = Some(principal);
                }
                Err(e) => error!("cannot bind user authentication: {e}"),
            }
        }
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Policy gate. Public routes pass through untouched; everything else
/// requires a principal bound by `authenticate`, otherwise the request is
/// rejected before any handler runs.
pub async fn require_authentication(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if state.policy.is_public(req.uri().path()) {
        return next.run(req).await;
    }
    let authenticated = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.is_authenticated())
        .unwrap_or(false);
    if !authenticated {
        error!("unauthorized request to {}", req.uri().path());
        return AppError::auth("UNAUTHORIZED", "authentication is required to access this resource")
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_exact_prefix() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn request_ids_are_distinct() {
        assert_ne!(gen_request_id(), gen_request_id());
    }
}

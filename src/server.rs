//!
//! gatehouse HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP API for gatehouse.
//!
//! Responsibilities:
//! - Registration and login endpoints backed by the account orchestrator.
//! - Boundary validation of inbound payloads, reported per field.
//! - Mounting the authentication pipeline (optimistic authenticator plus
//!   policy gate) over every route.
//! - A public test endpoint and a protected identity echo.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{
    self, AccessPolicy, AccountService, Credentials, IdentityResolver, NewAccount, Principal,
    RequestContext,
};
use crate::security;
use crate::store::{FileStore, RoleStore, User, UserStore};
use crate::token::TokenService;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Shared server state injected into all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub resolver: IdentityResolver,
    pub tokens: TokenService,
    pub policy: Arc<AccessPolicy>,
}

/// Open the store, seed the canonical roles and wire the services.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = Arc::new(FileStore::open(&config.db_root)?);
    store.ensure_default_roles()?;
    let users: Arc<dyn UserStore> = store.clone();
    let roles: Arc<dyn RoleStore> = store.clone();
    let tokens = TokenService::new(&config.jwt_secret, config.jwt_ttl_ms)?;
    let resolver = IdentityResolver::new(users.clone());
    let accounts =
        Arc::new(AccountService::new(users, roles, resolver.clone(), tokens.clone()));
    Ok(AppState { accounts, resolver, tokens, policy: Arc::new(AccessPolicy::new()) })
}

/// Assemble the router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/test/ping", get(ping))
        .route("/api/me", get(me))
        // The gate reads what the authenticator bound, so the authenticator
        // is added last and runs outermost.
        .layer(middleware::from_fn_with_state(state.clone(), identity::require_authentication))
        .layer(middleware::from_fn_with_state(state.clone(), identity::authenticate))
        .with_state(state)
}

/// Start the gatehouse HTTP server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let app = app(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    roles: Vec<String>,
}

impl SignupPayload {
    fn validate(&self) -> AppResult<()> {
        let mut errors = BTreeMap::new();
        if self.username.trim().is_empty() {
            errors.insert("username".to_string(), "must not be blank".to_string());
        } else if !(3..=20).contains(&self.username.chars().count()) {
            errors.insert("username".to_string(), "size must be between 3 and 20".to_string());
        }
        if self.password.trim().is_empty() {
            errors.insert("password".to_string(), "must not be blank".to_string());
        } else if !(6..=40).contains(&self.password.chars().count()) {
            errors.insert("password".to_string(), "size must be between 6 and 40".to_string());
        }
        if self.email.trim().is_empty() {
            errors.insert("email".to_string(), "must not be blank".to_string());
        } else if self.email.chars().count() > 50 {
            errors.insert("email".to_string(), "size must be between 0 and 50".to_string());
        } else if !EMAIL_RE.is_match(&self.email) {
            errors.insert("email".to_string(), "must be a well-formed email address".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl LoginPayload {
    fn validate(&self) -> AppResult<()> {
        let mut errors = BTreeMap::new();
        if self.username.trim().is_empty() {
            errors.insert("username".to_string(), "must not be blank".to_string());
        }
        if self.password.trim().is_empty() {
            errors.insert("password".to_string(), "must not be blank".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(errors))
        }
    }
}

/// Created-user summary; the password hash never serializes outward.
#[derive(Debug, Serialize)]
struct UserSummary {
    id: String,
    username: String,
    email: String,
    roles: Vec<&'static str>,
}

impl UserSummary {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.iter().map(|r| r.as_str()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct JwtResponse {
    token: String,
    id: String,
    username: String,
    email: String,
    roles: Vec<String>,
}

fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let mut errors = BTreeMap::new();
            errors.insert("body".to_string(), rejection.body_text());
            Err(AppError::validation(errors))
        }
    }
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<SignupPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let payload = require_json(payload)?;
    payload.validate()?;
    // Hash once, at the edge where the plaintext arrives.
    let password_hash = security::hash_password(&payload.password)?;
    let user = state.accounts.register(NewAccount {
        username: payload.username,
        email: payload.email,
        password_hash,
        roles: payload.roles,
    })?;
    Ok((StatusCode::CREATED, Json(UserSummary::from_user(&user))))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> AppResult<Json<JwtResponse>> {
    let payload = require_json(payload)?;
    payload.validate()?;
    let resp = state.accounts.login(&Credentials {
        username: payload.username,
        password: payload.password,
    })?;
    Ok(Json(JwtResponse {
        token: resp.token,
        id: resp.principal.id.clone(),
        username: resp.principal.username.clone(),
        email: resp.principal.email.clone(),
        roles: resp.principal.authorities,
    }))
}

async fn ping() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn me(Extension(ctx): Extension<RequestContext>) -> AppResult<Json<Principal>> {
    let principal = ctx
        .principal
        .ok_or_else(|| AppError::auth("UNAUTHORIZED", "no authenticated principal bound"))?;
    Ok(Json(principal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, password: &str, email: &str) -> SignupPayload {
        SignupPayload {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            roles: vec![],
        }
    }

    #[test]
    fn signup_validation_reports_each_bad_field() {
        let err = signup("ab", "short", "not-an-email").validate().unwrap_err();
        let AppError::Validation { field_errors } = err else {
            panic!("expected validation error")
        };
        assert_eq!(field_errors.len(), 3);
        assert_eq!(field_errors["username"], "size must be between 3 and 20");
        assert_eq!(field_errors["password"], "size must be between 6 and 40");
        assert_eq!(field_errors["email"], "must be a well-formed email address");
    }

    #[test]
    fn signup_validation_flags_blank_fields() {
        let err = signup("", "", "").validate().unwrap_err();
        let AppError::Validation { field_errors } = err else {
            panic!("expected validation error")
        };
        assert!(field_errors.values().all(|m| m == "must not be blank"));
    }

    #[test]
    fn signup_validation_accepts_well_formed_input() {
        assert!(signup("alice", "s3cretpw", "alice@example.com").validate().is_ok());
    }

    #[test]
    fn signup_validation_limits_email_length() {
        let long = format!("{}@example.com", "a".repeat(50));
        let err = signup("alice", "s3cretpw", &long).validate().unwrap_err();
        let AppError::Validation { field_errors } = err else {
            panic!("expected validation error")
        };
        assert_eq!(field_errors["email"], "size must be between 0 and 50");
    }

    #[test]
    fn login_validation_requires_both_fields() {
        let err = LoginPayload { username: "alice".into(), password: "  ".into() }
            .validate()
            .unwrap_err();
        let AppError::Validation { field_errors } = err else {
            panic!("expected validation error")
        };
        assert_eq!(field_errors.len(), 1);
        assert!(field_errors.contains_key("password"));
    }
}

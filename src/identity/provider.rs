use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::security;
use crate::store::{gen_id, RoleName, RoleStore, User, UserStore};
use crate::token::TokenService;

use super::{IdentityResolver, Principal};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration input as it reaches the orchestrator: the password was
/// hashed once at the boundary, so only the digest travels from here on.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub principal: Principal,
}

/// Business-rule surface for account creation and credential login.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    resolver: IdentityResolver,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        resolver: IdentityResolver,
        tokens: TokenService,
    ) -> Self {
        Self { users, roles, resolver, tokens }
    }

    /// Create an account after uniqueness and role checks. Any requested
    /// role name with no registry match fails the whole registration, named
    /// in the error; the persisted role set is the registry intersection of
    /// what was requested.
    pub fn register(&self, account: NewAccount) -> AppResult<User> {
        if self.users.exists_by_username(&account.username)? {
            return Err(AppError::domain(
                "DUPLICATE_USERNAME",
                format!("user with username '{}' already exists", account.username),
            ));
        }
        if self.users.exists_by_email(&account.email)? {
            return Err(AppError::domain(
                "DUPLICATE_EMAIL",
                format!("user with email '{}' already exists", account.email),
            ));
        }

        let master = self.roles.all()?;
        let unknown: Vec<String> = account
            .roles
            .iter()
            .filter(|name| !master.iter().any(|r| r.name.as_str() == name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::domain(
                "INVALID_ROLES",
                format!("unknown roles: {}", unknown.join(", ")),
            ));
        }
        let granted: Vec<RoleName> = master
            .iter()
            .filter(|r| account.roles.iter().any(|name| name == r.name.as_str()))
            .map(|r| r.name)
            .collect();

        let user = User {
            id: gen_id(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            roles: granted,
        };
        let saved = self.users.insert(user)?;
        info!("registered user {} id={}", saved.username, saved.id);
        Ok(saved)
    }

    /// Verify credentials, then resolve the principal and issue its token.
    /// An unknown username and a wrong password are indistinguishable from
    /// the outside.
    pub fn login(&self, credentials: &Credentials) -> AppResult<LoginResponse> {
        let stored = self.users.find_by_username(&credentials.username)?;
        let verified = stored
            .as_ref()
            .map(|u| security::verify_password(&u.password_hash, &credentials.password))
            .unwrap_or(false);
        if !verified {
            return Err(AppError::domain("BAD_CREDENTIALS", "bad credentials"));
        }

        let principal = self.resolver.resolve(&credentials.username)?;
        let token = self.tokens.issue(&principal)?;
        info!("auth.login user={}", principal.username);
        Ok(LoginResponse { token, principal })
    }
}

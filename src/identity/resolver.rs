use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::UserStore;

use super::principal::Principal;

/// Turns a token subject back into a full principal by reloading the stored
/// record, so authorities always reflect the roles at resolution time rather
/// than at token issue time.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub fn resolve(&self, username: &str) -> AppResult<Principal> {
        let user = self
            .users
            .find_by_username(username)?
            .ok_or_else(|| {
                AppError::not_found("USER_NOT_FOUND", format!("user not found: {username}"))
            })?;
        Ok(Principal::from_user(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, RoleName, User};
    use tempfile::tempdir;

    #[test]
    fn resolves_known_user_with_authorities() {
        let tmp = tempdir().unwrap();
        let store = Arc::new(FileStore::open(tmp.path()).unwrap());
        store
            .insert(User {
                id: "u1".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "phc".to_string(),
                roles: vec![RoleName::User, RoleName::Admin],
            })
            .unwrap();

        let resolver = IdentityResolver::new(store);
        let p = resolver.resolve("alice").unwrap();
        assert_eq!(p.id, "u1");
        assert_eq!(p.authorities, vec!["ROLE_ADMIN", "ROLE_USER"]);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let tmp = tempdir().unwrap();
        let store = Arc::new(FileStore::open(tmp.path()).unwrap());
        let resolver = IdentityResolver::new(store);
        let err = resolver.resolve("ghost").unwrap_err();
        assert_eq!(err.code_str(), "USER_NOT_FOUND");
    }
}

use serde::Serialize;

use crate::store::User;

/// Authenticated identity as seen by request handling. Derived from a stored
/// user on every authentication, never persisted. The password hash stays in
/// the store record and is not carried here.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
    /// One authority string per granted role, sorted for stable output.
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        let mut authorities: Vec<String> =
            user.roles.iter().map(|r| r.authority().to_string()).collect();
        authorities.sort();
        authorities.dedup();
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            authorities,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

// Two principals are the same identity exactly when their ids match; the
// authority set and email play no part in context comparisons.
impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Principal {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{gen_id, RoleName};

    fn stored(username: &str, roles: Vec<RoleName>) -> User {
        User {
            id: gen_id(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "phc".to_string(),
            roles,
        }
    }

    #[test]
    fn authorities_map_one_per_role() {
        let user = stored("alice", vec![RoleName::Moderator, RoleName::Admin]);
        let p = Principal::from_user(&user);
        assert_eq!(p.authorities, vec!["ROLE_ADMIN", "ROLE_MODERATOR"]);
        assert!(p.has_authority("ROLE_ADMIN"));
        assert!(!p.has_authority("ROLE_USER"));
    }

    #[test]
    fn equality_is_id_only() {
        let user = stored("alice", vec![RoleName::User]);
        let mut a = Principal::from_user(&user);
        let b = Principal::from_user(&user);
        a.authorities.clear();
        a.email = "other@example.com".to_string();
        assert_eq!(a, b);

        let c = Principal::from_user(&stored("alice", vec![RoleName::User]));
        assert_ne!(b, c); // same username, different stored id
    }
}

//! Account and role records plus the adapters that load them.
//! The core only ever talks to the `UserStore`/`RoleStore` traits; the
//! bundled `FileStore` keeps JSON catalogs under a data root so a single
//! process is fully self-contained.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Closed set of role names. Roles are reference data: seeded once, looked up
/// by name, and referenced (never owned) by users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "MODERATOR")]
    Moderator,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::User, RoleName::Moderator];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "ADMIN",
            RoleName::User => "USER",
            RoleName::Moderator => "MODERATOR",
        }
    }

    /// Authority string granted to a principal holding this role.
    pub fn authority(&self) -> &'static str {
        match self {
            RoleName::Admin => "ROLE_ADMIN",
            RoleName::User => "ROLE_USER",
            RoleName::Moderator => "ROLE_MODERATOR",
        }
    }

    pub fn parse(name: &str) -> Option<RoleName> {
        RoleName::ALL.iter().copied().find(|r| r.as_str() == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: RoleName,
}

/// Stored identity record. The password hash never leaves the store layer;
/// outward representations are built from `identity::Principal` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store catalog: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait UserStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    fn exists_by_username(&self, username: &str) -> Result<bool, StoreError>;
    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;
    fn insert(&self, user: User) -> Result<User, StoreError>;
}

pub trait RoleStore: Send + Sync {
    fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, StoreError>;
    fn all(&self) -> Result<Vec<Role>, StoreError>;
    fn insert(&self, role: Role) -> Result<Role, StoreError>;
}

/// 128-bit random id, lowercase hex.
pub fn gen_id() -> String {
    let mut bytes = [0u8; 16];
    let _ = getrandom::getrandom(&mut bytes);
    let mut id = String::with_capacity(32);
    for b in &bytes {
        let _ = write!(&mut id, "{:02x}", b);
    }
    id
}

#[derive(Debug, Default)]
struct Catalog {
    users: Vec<User>,
    roles: Vec<Role>,
}

/// JSON-file-backed store. All reads go through an in-memory catalog; every
/// mutation rewrites the backing file before returning. The lock is only held
/// around the map and the file write, never across an await point.
pub struct FileStore {
    users_path: PathBuf,
    roles_path: PathBuf,
    inner: RwLock<Catalog>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let users_path = root.join("users.json");
        let roles_path = root.join("roles.json");
        let users: Vec<User> = read_catalog_file(&users_path)?;
        let roles: Vec<Role> = read_catalog_file(&roles_path)?;
        Ok(Self { users_path, roles_path, inner: RwLock::new(Catalog { users, roles }) })
    }

    /// Seed the canonical role set on first start; existing entries are left
    /// untouched so ids stay stable across restarts.
    pub fn ensure_default_roles(&self) -> Result<(), StoreError> {
        for name in RoleName::ALL {
            if self.find_by_name(name)?.is_some() {
                info!("role {} already exists", name.as_str());
                continue;
            }
            RoleStore::insert(self, Role { id: gen_id(), name })?;
            info!("inserted role: {}", name.as_str());
        }
        Ok(())
    }

    fn persist_users(&self, catalog: &Catalog) -> Result<(), StoreError> {
        write_catalog_file(&self.users_path, &catalog.users)
    }

    fn persist_roles(&self, catalog: &Catalog) -> Result<(), StoreError> {
        write_catalog_file(&self.roles_path, &catalog.roles)
    }
}

fn read_catalog_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_catalog_file<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, raw)?;
    Ok(())
}

impl UserStore for FileStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let catalog = self.inner.read();
        Ok(catalog.users.iter().find(|u| u.username == username).cloned())
    }

    fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let catalog = self.inner.read();
        Ok(catalog.users.iter().any(|u| u.username == username))
    }

    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let catalog = self.inner.read();
        Ok(catalog.users.iter().any(|u| u.email == email))
    }

    fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut catalog = self.inner.write();
        catalog.users.push(user.clone());
        self.persist_users(&catalog)?;
        Ok(user)
    }
}

impl RoleStore for FileStore {
    fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, StoreError> {
        let catalog = self.inner.read();
        Ok(catalog.roles.iter().find(|r| r.name == name).cloned())
    }

    fn all(&self) -> Result<Vec<Role>, StoreError> {
        let catalog = self.inner.read();
        Ok(catalog.roles.clone())
    }

    fn insert(&self, role: Role) -> Result<Role, StoreError> {
        let mut catalog = self.inner.write();
        catalog.roles.push(role.clone());
        self.persist_roles(&catalog)?;
        Ok(role)
    }
}

//! In-memory stores, used by tests and for running without a database
//!
//! They mirror the PostgreSQL schema's unique constraints so that conflict
//! handling behaves the same against either backend.

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::role::RoleStore;
use super::user::UserStore;
use crate::models::role::{ROLE_ADMIN, ROLE_USER};
use crate::models::{Page, PageRequest, Role, User, UserDraft, UserId};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Default)]
struct UserTable {
    rows: BTreeMap<UserId, User>,
    last_id: UserId,
}

/// User store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> DatabaseResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_page(&self, request: PageRequest) -> DatabaseResult<Page<User>> {
        let table = self.table.read().await;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);

        let content = table
            .rows
            .values()
            .skip(skip)
            .take(request.size as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, request, table.rows.len() as u64))
    }

    async fn save(&self, draft: UserDraft) -> DatabaseResult<User> {
        let mut table = self.table.write().await;

        let is_other = |u: &User| Some(u.id) != draft.id;
        if table
            .rows
            .values()
            .any(|u| is_other(u) && u.username == draft.username)
        {
            return Err(DatabaseError::unique_violation(USERNAME_CONSTRAINT, "username"));
        }
        if table
            .rows
            .values()
            .any(|u| is_other(u) && u.email == draft.email)
        {
            return Err(DatabaseError::unique_violation(EMAIL_CONSTRAINT, "email"));
        }

        let now = Utc::now();
        let (id, created_at) = match draft.id {
            Some(id) => {
                let existing = table.rows.get(&id).ok_or(DatabaseError::NotFound)?;
                (id, existing.created_at)
            }
            None => {
                table.last_id += 1;
                (table.last_id, now)
            }
        };

        let user = User {
            id,
            username: draft.username,
            email: draft.email,
            password_hash: draft.password_hash,
            firstname: draft.firstname,
            lastname: draft.lastname,
            roles: draft.roles,
            created_at,
            updated_at: now,
        };
        table.rows.insert(id, user.clone());

        tracing::info!(user_id = id, "Saved user");
        Ok(user)
    }

    async fn delete_by_id(&self, id: UserId) -> DatabaseResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn exists_by_id(&self, id: UserId) -> DatabaseResult<bool> {
        let table = self.table.read().await;
        Ok(table.rows.contains_key(&id))
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let table = self.table.read().await;
        Ok(table.rows.len() as u64)
    }
}

/// Fixed role catalog kept in process memory
#[derive(Debug, Clone)]
pub struct InMemoryRoleRepository {
    roles: Arc<BTreeSet<Role>>,
}

impl InMemoryRoleRepository {
    /// Catalog holding exactly the given role names
    pub fn with_roles<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: Arc::new(names.into_iter().map(Role::new).collect()),
        }
    }
}

impl Default for InMemoryRoleRepository {
    /// Same seed as the database migration
    fn default() -> Self {
        Self::with_roles([ROLE_USER, ROLE_ADMIN])
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleRepository {
    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        Ok(self.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn find_all(&self) -> DatabaseResult<Vec<Role>> {
        Ok(self.roles.iter().cloned().collect())
    }
}

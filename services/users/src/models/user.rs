//! User model and related functionality

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::role::Role;

/// Store-assigned user identifier
pub type UserId = i64;

/// User entity as persisted
///
/// Not `Serialize`: the password hash only leaves the service through
/// [`UserResponse`](super::UserResponse), which drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Role names in sorted order
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    /// Copy of the mutable state, keyed by this user's id
    pub fn to_draft(&self) -> UserDraft {
        UserDraft {
            id: Some(self.id),
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Write payload for `UserStore::save`
///
/// `id: None` inserts a new record, `Some(id)` replaces the mutable fields of
/// an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub roles: BTreeSet<Role>,
}

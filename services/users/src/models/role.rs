//! Role model and related functionality

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::UserId;

/// Name of the default role granted to regular accounts
pub const ROLE_USER: &str = "USER";

/// Name of the role allowed to delete accounts
pub const ROLE_ADMIN: &str = "ADMIN";

/// Role entity, identified by its name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub name: String,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// User role association
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_name: String,
}

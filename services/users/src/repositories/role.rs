//! Role catalog repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::debug;

use crate::models::Role;

/// Read access to the role catalog
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Find a role by its name
    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Role>>;

    /// List every role, ordered by name
    async fn find_all(&self) -> DatabaseResult<Vec<Role>>;
}

/// PostgreSQL-backed role catalog
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new role repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleRepository {
    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        debug!(role = %name, "Finding role by name");

        let role = sqlx::query_as::<_, Role>("SELECT name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_all(&self) -> DatabaseResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT name FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }
}

//! User repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::models::{Page, PageRequest, Role, User, UserDraft, UserId, UserRole};

/// Persistence gateway for user records
///
/// `save` persists the user row and its role links as one unit: either both
/// are written or neither is.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> DatabaseResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Users ordered by id, sliced by the page request
    async fn find_page(&self, request: PageRequest) -> DatabaseResult<Page<User>>;

    /// Insert (`id: None`) or replace (`id: Some`) a user with its roles
    ///
    /// Replacing a missing id yields [`DatabaseError::NotFound`].
    async fn save(&self, draft: UserDraft) -> DatabaseResult<User>;

    /// Delete a user, returning whether a row was removed
    async fn delete_by_id(&self, id: UserId) -> DatabaseResult<bool>;

    async fn exists_by_id(&self, id: UserId) -> DatabaseResult<bool>;

    async fn count(&self) -> DatabaseResult<u64>;
}

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_roles(&self, row: Option<PgRow>) -> DatabaseResult<Option<User>> {
        match row {
            Some(row) => {
                let id: UserId = row.get("id");
                let mut roles = load_roles(&self.pool, &[id]).await?;
                Ok(Some(user_from_row(&row, roles.remove(&id).unwrap_or_default())))
            }
            None => Ok(None),
        }
    }
}

fn user_from_row(row: &PgRow, roles: BTreeSet<Role>) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        firstname: row.get("firstname"),
        lastname: row.get("lastname"),
        roles,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Role sets for the given users, keyed by user id
async fn load_roles<'e, E>(
    executor: E,
    user_ids: &[UserId],
) -> DatabaseResult<HashMap<UserId, BTreeSet<Role>>>
where
    E: PgExecutor<'e>,
{
    let links = sqlx::query_as::<_, UserRole>(
        r#"
        SELECT user_id, role_name
        FROM user_roles
        WHERE user_id = ANY($1)
        "#,
    )
    .bind(user_ids.to_vec())
    .fetch_all(executor)
    .await?;

    let mut roles: HashMap<UserId, BTreeSet<Role>> = HashMap::new();
    for link in links {
        roles
            .entry(link.user_id)
            .or_default()
            .insert(Role::new(link.role_name));
    }
    Ok(roles)
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> DatabaseResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        debug!("Finding user by username: {}", username);

        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        self.attach_roles(row).await
    }

    async fn find_page(&self, request: PageRequest) -> DatabaseResult<Page<User>> {
        let total = self.count().await?;

        let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, firstname, lastname, created_at, updated_at
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(request.size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<UserId> = rows.iter().map(|row| row.get("id")).collect();
        let mut roles = load_roles(&self.pool, &ids).await?;

        let users = rows
            .iter()
            .map(|row| {
                let id: UserId = row.get("id");
                user_from_row(row, roles.remove(&id).unwrap_or_default())
            })
            .collect();

        Ok(Page::new(users, request, total))
    }

    async fn save(&self, draft: UserDraft) -> DatabaseResult<User> {
        let mut tx = self.pool.begin().await?;

        let row = match draft.id {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO users (username, email, password_hash, firstname, lastname)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, username, email, password_hash, firstname, lastname, created_at, updated_at
                    "#,
                )
                .bind(&draft.username)
                .bind(&draft.email)
                .bind(&draft.password_hash)
                .bind(&draft.firstname)
                .bind(&draft.lastname)
                .fetch_one(&mut *tx)
                .await?
            }
            Some(id) => sqlx::query(
                r#"
                UPDATE users
                SET username = $2, email = $3, password_hash = $4,
                    firstname = $5, lastname = $6, updated_at = NOW()
                WHERE id = $1
                RETURNING id, username, email, password_hash, firstname, lastname, created_at, updated_at
                "#,
            )
            .bind(id)
            .bind(&draft.username)
            .bind(&draft.email)
            .bind(&draft.password_hash)
            .bind(&draft.firstname)
            .bind(&draft.lastname)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DatabaseError::NotFound)?,
        };

        let id: UserId = row.get("id");

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let role_names: Vec<String> = draft.roles.iter().map(|r| r.name.clone()).collect();
        if !role_names.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_name)
                SELECT $1, UNNEST($2::text[])
                "#,
            )
            .bind(id)
            .bind(role_names)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!("Saved user {} ({})", id, draft.username);
        Ok(user_from_row(&row, draft.roles))
    }

    async fn delete_by_id(&self, id: UserId) -> DatabaseResult<bool> {
        // user_roles rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_id(&self, id: UserId) -> DatabaseResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn count(&self) -> DatabaseResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

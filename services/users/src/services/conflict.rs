//! Uniqueness checks and translation of store constraint failures
//!
//! A write is checked twice. Before `save`, the store is queried for another
//! user holding the same username or email. If a concurrent writer slips in
//! between that query and the write, the store's unique constraint fires
//! instead and [`translate_save_error`] turns it into the same conflict.

use common::error::DatabaseError;
use tracing::debug;

use crate::error::{ConflictField, UserError, UserResult};
use crate::models::{UserDraft, UserId};
use crate::repositories::UserStore;

/// Fail with a conflict if another user already holds the draft's username
/// or email
pub async fn ensure_unique(store: &dyn UserStore, draft: &UserDraft) -> UserResult<()> {
    if let Some(existing) = store.find_by_username(&draft.username).await? {
        if Some(existing.id) != draft.id {
            debug!(username = %draft.username, "Username already taken");
            return Err(UserError::Conflict(Some(ConflictField::Username)));
        }
    }

    if let Some(existing) = store.find_by_email(&draft.email).await? {
        if Some(existing.id) != draft.id {
            debug!(email = %draft.email, "Email already registered");
            return Err(UserError::Conflict(Some(ConflictField::Email)));
        }
    }

    Ok(())
}

/// Map a failed `save` to a domain error
///
/// `id` is the id being updated, if any.
pub fn translate_save_error(err: DatabaseError, id: Option<UserId>) -> UserError {
    match err {
        DatabaseError::UniqueViolation { constraint, column } => {
            let field = conflict_field(column.as_deref())
                .or_else(|| conflict_field(constraint.as_deref()));
            UserError::Conflict(field)
        }
        DatabaseError::NotNullViolation { column } => {
            UserError::MissingField(column.unwrap_or_else(|| "unknown".to_string()))
        }
        DatabaseError::NotFound => match id {
            Some(id) => UserError::NotFound(id),
            None => UserError::Persistence(DatabaseError::NotFound),
        },
        other => UserError::Persistence(other),
    }
}

fn conflict_field(name: Option<&str>) -> Option<ConflictField> {
    let name = name?.to_ascii_lowercase();
    if name.contains("username") {
        Some(ConflictField::Username)
    } else if name.contains("email") {
        Some(ConflictField::Email)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::repositories::InMemoryUserRepository;
    use std::collections::BTreeSet;

    fn draft(username: &str, email: &str) -> UserDraft {
        UserDraft {
            id: None,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            firstname: None,
            lastname: None,
            roles: BTreeSet::from([Role::new("USER")]),
        }
    }

    #[tokio::test]
    async fn test_precheck_reports_the_colliding_field() {
        let store = InMemoryUserRepository::new();
        store.save(draft("alice", "alice@x.com")).await.unwrap();

        let err = ensure_unique(&store, &draft("alice", "new@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict(Some(ConflictField::Username))));

        let err = ensure_unique(&store, &draft("bob", "alice@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict(Some(ConflictField::Email))));

        assert!(ensure_unique(&store, &draft("bob", "bob@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_precheck_ignores_the_user_being_updated() {
        let store = InMemoryUserRepository::new();
        let alice = store.save(draft("alice", "alice@x.com")).await.unwrap();

        assert!(ensure_unique(&store, &alice.to_draft()).await.is_ok());
    }

    #[test]
    fn test_unique_violation_is_attributed_by_column_then_constraint() {
        let by_column = translate_save_error(
            DatabaseError::UniqueViolation {
                constraint: Some("some_index".to_string()),
                column: Some("email".to_string()),
            },
            None,
        );
        assert!(matches!(by_column, UserError::Conflict(Some(ConflictField::Email))));

        let by_constraint = translate_save_error(
            DatabaseError::UniqueViolation {
                constraint: Some("users_username_key".to_string()),
                column: None,
            },
            None,
        );
        assert!(matches!(
            by_constraint,
            UserError::Conflict(Some(ConflictField::Username))
        ));

        let unknown = translate_save_error(
            DatabaseError::UniqueViolation {
                constraint: Some("users_pkey".to_string()),
                column: None,
            },
            None,
        );
        assert_eq!(unknown.to_string(), "A unique field constraint was violated.");
    }

    #[test]
    fn test_other_store_failures() {
        let missing = translate_save_error(
            DatabaseError::NotNullViolation {
                column: Some("password_hash".to_string()),
            },
            None,
        );
        assert!(matches!(missing, UserError::MissingField(ref c) if c == "password_hash"));

        let vanished = translate_save_error(DatabaseError::NotFound, Some(7));
        assert!(matches!(vanished, UserError::NotFound(7)));

        let broken = translate_save_error(DatabaseError::Configuration("bad".to_string()), None);
        assert!(matches!(broken, UserError::Persistence(_)));
    }
}

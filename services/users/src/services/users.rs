//! User service: orchestrates validation, role resolution, uniqueness checks
//! and persistence for every user operation

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::conflict::{ensure_unique, translate_save_error};
use super::roles::RoleResolver;
use crate::error::{UserError, UserResult};
use crate::models::{
    CreateUserRequest, Page, PageRequest, PatchUserRequest, UpdateUserRequest, User, UserDraft,
    UserId,
};
use crate::password::PasswordService;
use crate::repositories::UserStore;
use crate::validation::{FieldViolation, validate_create, validate_patch};

/// User service
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    roles: RoleResolver,
    passwords: PasswordService,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, roles: RoleResolver, passwords: PasswordService) -> Self {
        Self {
            store,
            roles,
            passwords,
        }
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    pub async fn get_page(&self, request: PageRequest) -> UserResult<Page<User>> {
        Ok(self.store.find_page(request).await?)
    }

    pub async fn get_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn get_by_username(&self, username: &str) -> UserResult<Option<User>> {
        Ok(self.store.find_by_username(username).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        Ok(self.store.find_by_email(email).await?)
    }

    pub async fn count(&self) -> UserResult<u64> {
        Ok(self.store.count().await?)
    }

    /// Create a user
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn add(&self, request: CreateUserRequest) -> UserResult<User> {
        validate_create(&request).map_err(rejected)?;

        let roles = self
            .roles
            .resolve(request.roles.as_deref().unwrap_or_default())
            .await?;

        let draft = UserDraft {
            id: None,
            password_hash: self.passwords.hash(&request.password)?,
            username: request.username,
            email: request.email,
            firstname: request.firstname,
            lastname: request.lastname,
            roles,
        };

        let user = self.persist(draft).await?;
        info!(user_id = user.id, "Created user");
        Ok(user)
    }

    /// Replace every mutable field of an existing user
    #[instrument(skip(self, request))]
    pub async fn update(&self, id: UserId, request: UpdateUserRequest) -> UserResult<User> {
        validate_create(&request).map_err(rejected)?;

        let existing = self.load(id).await?;
        let roles = self
            .roles
            .resolve(request.roles.as_deref().unwrap_or_default())
            .await?;

        let draft = UserDraft {
            id: Some(existing.id),
            password_hash: self.passwords.hash(&request.password)?,
            username: request.username,
            email: request.email,
            firstname: request.firstname,
            lastname: request.lastname,
            roles,
        };

        let user = self.persist(draft).await?;
        info!(user_id = user.id, "Updated user");
        Ok(user)
    }

    /// Merge the fields present in `patch` onto the stored user
    ///
    /// The merge happens on a copy; the store sees a single `save` of the
    /// merged record or nothing at all.
    #[instrument(skip(self, patch))]
    pub async fn patch(&self, id: UserId, patch: PatchUserRequest) -> UserResult<User> {
        validate_patch(&patch).map_err(rejected)?;

        let mut draft = self.load(id).await?.to_draft();

        if let Some(username) = patch.username {
            draft.username = username;
        }
        if let Some(email) = patch.email {
            draft.email = email;
        }
        if let Some(password) = patch.password {
            draft.password_hash = self.passwords.hash(&password)?;
        }
        if let Some(firstname) = patch.firstname {
            draft.firstname = firstname;
        }
        if let Some(lastname) = patch.lastname {
            draft.lastname = lastname;
        }
        if let Some(names) = patch.roles {
            draft.roles = self.roles.resolve(&names).await?;
        }

        let user = self.persist(draft).await?;
        info!(user_id = user.id, "Patched user");
        Ok(user)
    }

    /// Delete a user; deleting an absent id is `NotFound`
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> UserResult<()> {
        if !self.store.delete_by_id(id).await? {
            return Err(UserError::NotFound(id));
        }

        info!(user_id = id, "Deleted user");
        Ok(())
    }

    async fn load(&self, id: UserId) -> UserResult<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn persist(&self, draft: UserDraft) -> UserResult<User> {
        ensure_unique(self.store.as_ref(), &draft).await?;

        let id = draft.id;
        self.store
            .save(draft)
            .await
            .map_err(|e| {
                if e.is_constraint_violation() {
                    warn!(error = %e, "Store rejected the write");
                }
                translate_save_error(e, id)
            })
    }
}

fn rejected(violations: Vec<FieldViolation>) -> UserError {
    warn!(?violations, "Request failed validation");
    UserError::Validation(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictField;
    use crate::repositories::{InMemoryRoleRepository, InMemoryUserRepository};
    use async_trait::async_trait;
    use common::error::DatabaseResult;

    /// Store whose lookups by username and email always miss, so a clash is
    /// only detected by `save`, as when a concurrent writer wins the race
    struct RacingStore {
        inner: InMemoryUserRepository,
    }

    #[async_trait]
    impl UserStore for RacingStore {
        async fn find_by_id(&self, id: UserId) -> DatabaseResult<Option<User>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_username(&self, _username: &str) -> DatabaseResult<Option<User>> {
            Ok(None)
        }

        async fn find_by_email(&self, _email: &str) -> DatabaseResult<Option<User>> {
            Ok(None)
        }

        async fn find_page(&self, request: PageRequest) -> DatabaseResult<Page<User>> {
            self.inner.find_page(request).await
        }

        async fn save(&self, draft: UserDraft) -> DatabaseResult<User> {
            self.inner.save(draft).await
        }

        async fn delete_by_id(&self, id: UserId) -> DatabaseResult<bool> {
            self.inner.delete_by_id(id).await
        }

        async fn exists_by_id(&self, id: UserId) -> DatabaseResult<bool> {
            self.inner.exists_by_id(id).await
        }

        async fn count(&self) -> DatabaseResult<u64> {
            self.inner.count().await
        }
    }

    fn service_over_racing_store() -> (UserService, InMemoryUserRepository) {
        let inner = InMemoryUserRepository::new();
        let store = Arc::new(RacingStore {
            inner: inner.clone(),
        });
        let roles = RoleResolver::new(Arc::new(InMemoryRoleRepository::default()));
        (UserService::new(store, roles, PasswordService::new()), inner)
    }

    fn service_with_store() -> (UserService, Arc<InMemoryUserRepository>) {
        let store = Arc::new(InMemoryUserRepository::new());
        let roles = RoleResolver::new(Arc::new(InMemoryRoleRepository::default()));
        let service = UserService::new(store.clone(), roles, PasswordService::new());
        (service, store)
    }

    fn request(username: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "p1".to_string(),
            firstname: Some("First".to_string()),
            lastname: Some("Last".to_string()),
            roles: Some(vec!["USER".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_add_hashes_the_password() {
        let (service, _) = service_with_store();

        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        assert!(user.id > 0);
        assert_ne!(user.password_hash, "p1");
        assert!(service.passwords().matches("p1", &user.password_hash));
        assert_eq!(user.role_names(), vec!["USER".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_is_a_conflict() {
        let (service, store) = service_with_store();
        service.add(request("alice", "a@x.com")).await.unwrap();

        let err = service.add(request("alice", "b@x.com")).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict(_)));
        assert!(err.to_string().contains("Username"));

        let err = service.add(request("bob", "a@x.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email is already registered.");

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_role_persists_nothing() {
        let (service, store) = service_with_store();
        let mut req = request("alice", "alice@x.com");
        req.roles = Some(vec!["GHOST".to_string()]);

        let err = service.add(req).await.unwrap_err();
        assert!(matches!(err, UserError::RoleNotFound(ref n) if n == "GHOST"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_the_store() {
        let (service, store) = service_with_store();
        let mut req = request("alice", "not-an-email");
        req.password = String::new();

        let err = service.add(req).await.unwrap_err();
        match err {
            UserError::Validation(violations) => assert_eq!(violations.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_patch_leaves_the_user_unchanged() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        let patched = service
            .patch(user.id, PatchUserRequest::default())
            .await
            .unwrap();

        assert_eq!(patched.username, user.username);
        assert_eq!(patched.email, user.email);
        assert_eq!(patched.password_hash, user.password_hash);
        assert_eq!(patched.firstname, user.firstname);
        assert_eq!(patched.lastname, user.lastname);
        assert_eq!(patched.roles, user.roles);
        assert_eq!(patched.created_at, user.created_at);
    }

    #[tokio::test]
    async fn test_patch_changes_only_present_fields() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        let patched = service
            .patch(
                user.id,
                PatchUserRequest {
                    username: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(patched.username, "x");
        assert_eq!(patched.email, user.email);
        assert_eq!(patched.password_hash, user.password_hash);
        assert_eq!(patched.firstname, user.firstname);
        assert_eq!(patched.lastname, user.lastname);
        assert_eq!(patched.roles, user.roles);
    }

    #[tokio::test]
    async fn test_patch_clears_names_rehashes_password_and_replaces_roles() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        let patched = service
            .patch(
                user.id,
                PatchUserRequest {
                    password: Some("p2".to_string()),
                    firstname: Some(None),
                    lastname: Some(Some(String::new())),
                    roles: Some(vec!["ADMIN".to_string(), "USER".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.passwords().matches("p2", &patched.password_hash));
        assert_eq!(patched.firstname, None);
        assert_eq!(patched.lastname.as_deref(), Some(""));
        assert_eq!(
            patched.role_names(),
            vec!["ADMIN".to_string(), "USER".to_string()]
        );
    }

    #[tokio::test]
    async fn test_patch_into_a_taken_email_changes_nothing() {
        let (service, store) = service_with_store();
        service.add(request("alice", "alice@x.com")).await.unwrap();
        let bob = service.add(request("bob", "bob@x.com")).await.unwrap();

        let err = service
            .patch(
                bob.id,
                PatchUserRequest {
                    username: Some("robert".to_string()),
                    email: Some("alice@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::Conflict(_)));
        let stored = store.find_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "bob");
    }

    #[tokio::test]
    async fn test_patch_of_unknown_id_is_not_found() {
        let (service, _) = service_with_store();

        let err = service
            .patch(
                999,
                PatchUserRequest {
                    username: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::NotFound(999)));
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_has_no_side_effects() {
        let (service, store) = service_with_store();

        let err = service
            .update(42, request("alice", "alice@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::NotFound(42)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_every_field() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        let mut replacement = request("alice2", "alice2@x.com");
        replacement.firstname = None;
        replacement.roles = Some(vec!["ADMIN".to_string()]);

        let updated = service.update(user.id, replacement).await.unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.firstname, None);
        assert_eq!(updated.role_names(), vec!["ADMIN".to_string()]);
    }

    #[tokio::test]
    async fn test_update_keeping_own_username_is_not_a_conflict() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        let updated = service
            .update(user.id, request("alice", "alice@x.com"))
            .await
            .unwrap();
        assert_eq!(updated.username, "alice");
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let (service, _) = service_with_store();
        let user = service.add(request("alice", "alice@x.com")).await.unwrap();

        service.delete(user.id).await.unwrap();
        let err = service.delete(user.id).await.unwrap_err();

        assert!(matches!(err, UserError::NotFound(id) if id == user.id));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookups_return_none_for_absent_users() {
        let (service, _) = service_with_store();
        service.add(request("alice", "alice@x.com")).await.unwrap();

        assert!(service.get_by_username("alice").await.unwrap().is_some());
        assert!(service.get_by_email("nobody@x.com").await.unwrap().is_none());
        assert!(service.get_by_id(999).await.unwrap().is_none());

        let page = service.get_page(PageRequest::new(0, 20, 100)).await.unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn test_clash_caught_only_by_save_is_still_a_conflict() {
        let (service, inner) = service_over_racing_store();
        service.add(request("alice", "alice@x.com")).await.unwrap();

        let err = service
            .add(request("alice", "other@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict(Some(ConflictField::Username))));
        assert_eq!(err.to_string(), "Username already exists.");
        assert_eq!(inner.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_patch_clash_caught_only_by_save_leaves_the_user_intact() {
        let (service, inner) = service_over_racing_store();
        service.add(request("alice", "alice@x.com")).await.unwrap();
        let bob = service.add(request("bob", "bob@x.com")).await.unwrap();

        let err = service
            .patch(
                bob.id,
                PatchUserRequest {
                    email: Some("alice@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::Conflict(Some(ConflictField::Email))));
        let stored = inner.find_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "bob@x.com");
    }
}

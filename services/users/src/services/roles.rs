//! Role name resolution against the role catalog

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{UserError, UserResult};
use crate::models::Role;
use crate::repositories::RoleStore;

/// Turns requested role names into catalog roles
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Resolve every name or none
    ///
    /// Names are de-duplicated and looked up in sorted order, so the reported
    /// unknown role is the first one alphabetically.
    pub async fn resolve<S: AsRef<str>>(&self, names: &[S]) -> UserResult<BTreeSet<Role>> {
        let wanted: BTreeSet<&str> = names.iter().map(|n| n.as_ref().trim()).collect();

        let mut roles = BTreeSet::new();
        for name in wanted {
            let role = self
                .store
                .find_by_name(name)
                .await?
                .ok_or_else(|| UserError::RoleNotFound(name.to_string()))?;
            roles.insert(role);
        }

        debug!(count = roles.len(), "Resolved roles");
        Ok(roles)
    }

    /// Every role a user can be granted, ordered by name
    pub async fn catalog(&self) -> UserResult<Vec<Role>> {
        Ok(self.store.find_all().await?)
    }
}

//! Reviewer-facing user directory.
//!
//! Role management is retired: [`DirectoryService::list_all_users`] and
//! [`DirectoryService::update_role`] refuse every caller.

use std::sync::Arc;

use tracing::{instrument, warn};

use preconfig_core::UserId;

use super::WorkflowError;
use crate::models::{CurrentUser, UserSummary};
use crate::store::{Stores, UserDirectory};

/// Returned by every retired user-management operation.
pub const USER_MANAGEMENT_DISABLED: &str =
    "User management is not available. Admin users can only delete requests.";

#[derive(Clone)]
pub struct DirectoryService {
    users: Arc<dyn UserDirectory>,
}

impl DirectoryService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            users: Arc::clone(&stores.users),
        }
    }

    /// Active users sorted by email, for the assignee picker.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller can view all requests.
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn list_users(&self, caller: &CurrentUser) -> Result<Vec<UserSummary>, WorkflowError> {
        require_reviewer(caller)?;
        let users = self.users.list_active().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the caller can view all requests,
    /// and `UserNotFound` if no such user exists.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, target = %id))]
    pub async fn get_user(
        &self,
        caller: &CurrentUser,
        id: UserId,
    ) -> Result<UserSummary, WorkflowError> {
        require_reviewer(caller)?;
        self.users
            .get_by_id(id)
            .await?
            .map(|user| UserSummary::from(&user))
            .ok_or(WorkflowError::UserNotFound(id))
    }

    /// # Errors
    ///
    /// Always returns `PermissionDenied`.
    #[allow(clippy::unused_async)]
    pub async fn list_all_users(
        &self,
        caller: &CurrentUser,
    ) -> Result<Vec<UserSummary>, WorkflowError> {
        warn!(user_id = %caller.id, "Refused listing all users");
        Err(WorkflowError::denied(USER_MANAGEMENT_DISABLED))
    }

    /// # Errors
    ///
    /// Always returns `PermissionDenied`.
    #[allow(clippy::unused_async)]
    pub async fn update_role(
        &self,
        caller: &CurrentUser,
        target: UserId,
    ) -> Result<UserSummary, WorkflowError> {
        warn!(user_id = %caller.id, target = %target, "Refused role update");
        Err(WorkflowError::denied(USER_MANAGEMENT_DISABLED))
    }
}

fn require_reviewer(caller: &CurrentUser) -> Result<(), WorkflowError> {
    if caller.role.can_view_all() {
        Ok(())
    } else {
        Err(WorkflowError::denied(
            "Only RAK Wireless employees can browse users",
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use preconfig_core::Role;

    use super::*;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn test_list_users_for_reviewers_only() {
        let fx = Fixture::new().await;
        fx.memory.deactivate_user(fx.stranger.id).await;

        let users = fx.directory.list_users(&fx.reviewer).await.unwrap();
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(
            emails,
            vec![
                "ada@rakwireless.com",
                "admin@rakwireless.com",
                "olive@customer.com",
                "rae@rakwireless.com",
            ]
        );

        let err = fx.directory.list_users(&fx.owner).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_get_user() {
        let fx = Fixture::new().await;

        let user = fx.directory.get_user(&fx.admin, fx.owner.id).await.unwrap();
        assert_eq!(user.name, "Olive Owner");
        assert_eq!(user.role, Role::User);

        let err = fx
            .directory
            .get_user(&fx.admin, UserId::new(4_242))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_user_management_refused_for_every_role() {
        let fx = Fixture::new().await;
        for caller in [&fx.owner, &fx.reviewer, &fx.admin] {
            let err = fx.directory.list_all_users(caller).await.unwrap_err();
            assert!(matches!(&err, WorkflowError::PermissionDenied(m) if m == USER_MANAGEMENT_DISABLED));

            let err = fx
                .directory
                .update_role(caller, fx.owner.id)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::PermissionDenied(_)));
        }
    }
}

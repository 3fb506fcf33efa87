//! Workflow services.
//!
//! Each service holds injected store handles and takes the resolved caller
//! ([`CurrentUser`](crate::models::CurrentUser)) on every call.

pub mod comments;
pub mod directory;
pub mod notifications;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashSet;

use thiserror::Error;

use preconfig_core::{CommentId, RequestId, UserId};

use crate::db::RepositoryError;

pub use comments::{CommentOutcome, CommentService};
pub use directory::DirectoryService;
pub use notifications::NotificationAggregator;
pub use workflow::{BatchDeleteOutcome, CreateOutcome, UpdateOutcome, WorkflowEngine};

/// Errors returned by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request does not exist.
    #[error("request not found: {0}")]
    NotFound(RequestId),

    /// The comment does not exist on the request.
    #[error("comment not found: {0}")]
    CommentNotFound(CommentId),

    /// The user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The caller lacks authority for the field or action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The input cannot be applied.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] RepositoryError),
}

impl WorkflowError {
    pub(crate) fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Distinct user ids in first-seen order, for batched directory lookups.
pub(crate) fn distinct_users(ids: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

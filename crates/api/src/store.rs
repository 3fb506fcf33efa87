//! Store collaborators consumed by the workflow services.
//!
//! Every trait is object safe so services hold `Arc<dyn …>` handles that
//! are injected once at start-up through [`Stores`]. Implementations must
//! never cache state across calls: each decision in the services is made
//! against freshly read data.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use preconfig_core::{CommentId, RequestId, UserId};

use crate::db::{
    MemoryStore, PgActivityLog, PgCommentStore, PgRequestStore, PgUserDirectory, RepositoryError,
};
use crate::models::{Activity, Comment, NewActivity, NewComment, Request, RequestUpdate, UserRecord};

/// Order in which activities are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

/// Durable storage for requests, keyed by request identifier.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Get a request by id.
    async fn get_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    /// Insert a new request. Fails with `Conflict` if the id is taken.
    async fn put(&self, request: &Request) -> Result<(), RepositoryError>;

    /// Apply `update` in one write and return the stored result.
    ///
    /// Removed fields are unset, not blanked. Fails with `NotFound` if the
    /// request does not exist.
    async fn update_fields(
        &self,
        id: &RequestId,
        update: &RequestUpdate,
    ) -> Result<Request, RepositoryError>;

    /// Delete a request. Returns whether it existed.
    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError>;

    /// Delete several requests. Returns how many existed.
    async fn delete_many(&self, ids: &[RequestId]) -> Result<u64, RepositoryError>;

    /// Requests created by `owner`.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Request>, RepositoryError>;

    /// Requests currently assigned to `assignee` (exact match).
    async fn list_by_assignee(&self, assignee: &str) -> Result<Vec<Request>, RepositoryError>;

    /// Every request.
    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Append-only audit log.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, activity: &NewActivity) -> Result<Activity, RepositoryError>;

    /// Activities for one request ordered by creation time.
    async fn list_by_request(
        &self,
        request_id: &RequestId,
        order: SortOrder,
    ) -> Result<Vec<Activity>, RepositoryError>;
}

/// Read access to the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by email, ignoring case.
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;

    /// Batched lookup. Unknown ids are absent from the map.
    async fn get_many(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserRecord>, RepositoryError>;

    /// Active users sorted by email.
    async fn list_active(&self) -> Result<Vec<UserRecord>, RepositoryError>;
}

/// Storage for request comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, comment: &NewComment) -> Result<Comment, RepositoryError>;

    /// Comments on one request, oldest first.
    async fn list_by_request(&self, request_id: &RequestId)
    -> Result<Vec<Comment>, RepositoryError>;

    async fn get(
        &self,
        request_id: &RequestId,
        id: CommentId,
    ) -> Result<Option<Comment>, RepositoryError>;

    /// Delete a comment. Returns whether it existed.
    async fn delete(&self, request_id: &RequestId, id: CommentId)
    -> Result<bool, RepositoryError>;
}

/// Process-wide store handles.
#[derive(Clone)]
pub struct Stores {
    pub requests: Arc<dyn RequestStore>,
    pub activities: Arc<dyn ActivityLog>,
    pub users: Arc<dyn UserDirectory>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    /// `PostgreSQL` adapters sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            requests: Arc::new(PgRequestStore::new(pool.clone())),
            activities: Arc::new(PgActivityLog::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            comments: Arc::new(PgCommentStore::new(pool.clone())),
        }
    }

    /// Every handle backed by the same in-memory store.
    #[must_use]
    pub fn memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            requests: Arc::clone(store) as Arc<dyn RequestStore>,
            activities: Arc::clone(store) as Arc<dyn ActivityLog>,
            users: Arc::clone(store) as Arc<dyn UserDirectory>,
            comments: Arc::clone(store) as Arc<dyn CommentStore>,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

//! In-memory implementation of every store trait.
//!
//! Backs the test suites and the `memory` backend. Failures can be injected
//! per concern to exercise the degraded paths of the workflow services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use preconfig_core::{ActivityId, CommentId, Email, RequestId, UserId};

use super::RepositoryError;
use crate::models::{
    Activity, Comment, FieldValue, NewActivity, NewComment, NewUser, Request, RequestUpdate,
    UserRecord,
};
use crate::store::{ActivityLog, CommentStore, RequestStore, SortOrder, UserDirectory};

/// Store keeping every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    requests: RwLock<HashMap<RequestId, Request>>,
    activities: RwLock<Vec<Activity>>,
    users: RwLock<Vec<UserRecord>>,
    comments: RwLock<Vec<Comment>>,
    next_activity_id: AtomicI32,
    next_user_id: AtomicI32,
    next_comment_id: AtomicI32,
    fail_activity_appends: AtomicBool,
    fail_request_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent [`ActivityLog::append`] fail.
    pub fn fail_activity_appends(&self, fail: bool) {
        self.fail_activity_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent request write (`put`, `update_fields`,
    /// `delete`, `delete_many`) fail.
    pub fn fail_request_writes(&self, fail: bool) {
        self.fail_request_writes.store(fail, Ordering::SeqCst);
    }

    /// Add a user to the directory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken
    /// (compared case-insensitively).
    pub async fn insert_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| same_email(&u.email, user.email.as_str())) {
            return Err(RepositoryError::Conflict(format!(
                "user already exists: {}",
                user.email
            )));
        }
        let record = UserRecord {
            id: UserId::new(next(&self.next_user_id)),
            email: user.email,
            name: user.name,
            role: user.role.map(|r| r.as_str().to_owned()),
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(record.clone());
        Ok(record)
    }

    /// Mark a user inactive. Returns whether the user existed.
    pub async fn deactivate_user(&self, id: UserId) -> bool {
        let mut users = self.users.write().await;
        users
            .iter_mut()
            .find(|u| u.id == id)
            .map(|u| u.is_active = false)
            .is_some()
    }

    fn check_request_writes(&self) -> Result<(), RepositoryError> {
        if self.fail_request_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "request writes disabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn next(counter: &AtomicI32) -> i32 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

fn same_email(email: &Email, other: &str) -> bool {
    email.as_str().eq_ignore_ascii_case(other.trim())
}

/// Mirror of the `requests.assignee` CHECK constraint.
fn check_update(update: &RequestUpdate) -> Result<(), RepositoryError> {
    let blank_assignee = update
        .set
        .iter()
        .any(|value| matches!(value, FieldValue::Assignee(a) if a.trim().is_empty()));
    if blank_assignee {
        return Err(RepositoryError::Conflict(
            "assignee cannot be blank".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn get_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        Ok(self.requests.read().await.get(id).cloned())
    }

    async fn put(&self, request: &Request) -> Result<(), RepositoryError> {
        self.check_request_writes()?;
        if request.assignee.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(RepositoryError::Conflict(
                "assignee cannot be blank".to_string(),
            ));
        }
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict(format!(
                "request already exists: {}",
                request.id
            )));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn update_fields(
        &self,
        id: &RequestId,
        update: &RequestUpdate,
    ) -> Result<Request, RepositoryError> {
        self.check_request_writes()?;
        check_update(update)?;
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(id).ok_or(RepositoryError::NotFound)?;
        request.apply(update);
        Ok(request.clone())
    }

    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        self.check_request_writes()?;
        Ok(self.requests.write().await.remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[RequestId]) -> Result<u64, RepositoryError> {
        self.check_request_writes()?;
        let mut requests = self.requests.write().await;
        let deleted = ids.iter().filter(|id| requests.remove(*id).is_some()).count();
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn list_by_assignee(&self, assignee: &str) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| {
                r.assignee
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(assignee))
            })
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError> {
        Ok(self.requests.read().await.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn append(&self, activity: &NewActivity) -> Result<Activity, RepositoryError> {
        if self.fail_activity_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "activity appends disabled".to_string(),
            ));
        }
        let stored = Activity {
            id: ActivityId::new(next(&self.next_activity_id)),
            request_id: activity.request_id.clone(),
            actor_id: activity.actor_id,
            activity_type: activity.activity_type,
            description: activity.description.clone(),
            created_at: activity.created_at,
        };
        self.activities.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_by_request(
        &self,
        request_id: &RequestId,
        order: SortOrder,
    ) -> Result<Vec<Activity>, RepositoryError> {
        let mut matching: Vec<Activity> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|a| &a.request_id == request_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if order == SortOrder::Descending {
            matching.reverse();
        }
        Ok(matching)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| same_email(&u.email, email)).cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_many(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let mut active: Vec<UserRecord> = self
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(active)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, comment: &NewComment) -> Result<Comment, RepositoryError> {
        let stored = Comment {
            id: CommentId::new(next(&self.next_comment_id)),
            request_id: comment.request_id.clone(),
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: Utc::now(),
        };
        self.comments.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_by_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let mut matching: Vec<Comment> = self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| &c.request_id == request_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(matching)
    }

    async fn get(
        &self,
        request_id: &RequestId,
        id: CommentId,
    ) -> Result<Option<Comment>, RepositoryError> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .find(|c| c.id == id && &c.request_id == request_id)
            .cloned())
    }

    async fn delete(&self, request_id: &RequestId, id: CommentId) -> Result<bool, RepositoryError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| !(c.id == id && &c.request_id == request_id));
        Ok(comments.len() != before)
    }
}

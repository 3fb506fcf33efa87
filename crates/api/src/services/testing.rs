//! Shared fixture for service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use preconfig_core::{Email, Role};

use crate::db::MemoryStore;
use crate::models::{CurrentUser, NewUser};
use crate::store::Stores;

use super::{CommentService, DirectoryService, NotificationAggregator, WorkflowEngine};

/// A memory-backed store with one user per role.
pub(crate) struct Fixture {
    pub memory: Arc<MemoryStore>,
    pub stores: Stores,
    pub engine: WorkflowEngine,
    pub feed: NotificationAggregator,
    pub comments: CommentService,
    pub directory: DirectoryService,
    /// Customer who owns the requests under test.
    pub owner: CurrentUser,
    /// Reviewer without an explicit role.
    pub reviewer: CurrentUser,
    /// Reviewer used as an assignment target.
    pub assignee: CurrentUser,
    pub admin: CurrentUser,
    /// Customer unrelated to the requests under test.
    pub stranger: CurrentUser,
}

impl Fixture {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let owner = add(&memory, "olive@customer.com", Some("Olive Owner"), None).await;
        let reviewer = add(&memory, "rae@rakwireless.com", Some("Rae Reviewer"), None).await;
        let assignee = add(&memory, "ada@rakwireless.com", Some("Ada Assignee"), None).await;
        let admin = add(&memory, "admin@rakwireless.com", Some("Ann Admin"), Some(Role::Admin)).await;
        let stranger = add(&memory, "sam@elsewhere.com", None, None).await;

        let stores = Stores::memory(&memory);
        Self {
            engine: WorkflowEngine::new(&stores),
            feed: NotificationAggregator::new(&stores),
            comments: CommentService::new(&stores),
            directory: DirectoryService::new(&stores),
            memory,
            stores,
            owner,
            reviewer,
            assignee,
            admin,
            stranger,
        }
    }
}

async fn add(
    memory: &MemoryStore,
    email: &str,
    name: Option<&str>,
    role: Option<Role>,
) -> CurrentUser {
    let record = memory
        .insert_user(NewUser {
            email: Email::parse(email).unwrap(),
            name: name.map(String::from),
            role,
        })
        .await
        .unwrap();
    CurrentUser::from(&record)
}

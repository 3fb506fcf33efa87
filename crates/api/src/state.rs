//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::services::{CommentService, DirectoryService, NotificationAggregator, WorkflowEngine};
use crate::store::Stores;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Store handles are injected once here and
/// shared by every service for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    workflow: WorkflowEngine,
    notifications: NotificationAggregator,
    comments: CommentService,
    directory: DirectoryService,
}

impl AppState {
    /// Wire every service to `stores`.
    #[must_use]
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                workflow: WorkflowEngine::new(&stores),
                notifications: NotificationAggregator::new(&stores),
                comments: CommentService::new(&stores),
                directory: DirectoryService::new(&stores),
                config,
                stores,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    #[must_use]
    pub fn workflow(&self) -> &WorkflowEngine {
        &self.inner.workflow
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationAggregator {
        &self.inner.notifications
    }

    #[must_use]
    pub fn comments(&self) -> &CommentService {
        &self.inner.comments
    }

    #[must_use]
    pub fn directory(&self) -> &DirectoryService {
        &self.inner.directory
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

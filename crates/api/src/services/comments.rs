//! Comments on requests.

use std::sync::Arc;

use tracing::{info, instrument};

use preconfig_core::{ActivityType, CommentId, RequestId};

use super::workflow::{fetch_visible, record_activity};
use super::{WorkflowError, distinct_users};
use crate::models::activity::{UNKNOWN_AUTHOR_EMAIL, UNKNOWN_AUTHOR_NAME};
use crate::models::{Comment, CommentView, CurrentUser, NewActivity, NewComment};
use crate::store::{ActivityLog, CommentStore, RequestStore, Stores, UserDirectory};

/// Characters of comment content quoted in the activity description.
const PREVIEW_CHARS: usize = 50;

/// Result of [`CommentService::add_comment`].
#[derive(Debug, Clone)]
pub struct CommentOutcome {
    pub comment: Comment,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct CommentService {
    requests: Arc<dyn RequestStore>,
    comments: Arc<dyn CommentStore>,
    activities: Arc<dyn ActivityLog>,
    users: Arc<dyn UserDirectory>,
}

impl CommentService {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            requests: Arc::clone(&stores.requests),
            comments: Arc::clone(&stores.comments),
            activities: Arc::clone(&stores.activities),
            users: Arc::clone(&stores.users),
        }
    }

    /// Post a comment on a request the caller can view.
    ///
    /// A `comment` activity is recorded on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied`, `InvalidInput` for blank
    /// content, or `StoreUnavailable`.
    #[instrument(skip(self, caller, content), fields(user_id = %caller.id, request_id = %id))]
    pub async fn add_comment(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
        content: &str,
    ) -> Result<CommentOutcome, WorkflowError> {
        let request = fetch_visible(self.requests.as_ref(), caller, id).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(WorkflowError::invalid("Comment content is required"));
        }

        let comment = self
            .comments
            .create(&NewComment {
                request_id: request.id.clone(),
                author_id: caller.id,
                content: content.to_owned(),
            })
            .await?;
        info!(comment_id = %comment.id, "Comment added");

        let mut warnings = Vec::new();
        record_activity(
            self.activities.as_ref(),
            NewActivity::now(
                request.id,
                caller.id,
                ActivityType::Comment,
                describe_comment(content),
            ),
            &mut warnings,
        )
        .await;

        Ok(CommentOutcome { comment, warnings })
    }

    /// Comments on a request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied` or `StoreUnavailable`.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, request_id = %id))]
    pub async fn list_comments(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
    ) -> Result<Vec<CommentView>, WorkflowError> {
        let request = fetch_visible(self.requests.as_ref(), caller, id).await?;
        let comments = self.comments.list_by_request(&request.id).await?;
        let authors = self
            .users
            .get_many(&distinct_users(comments.iter().map(|c| c.author_id)))
            .await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let (author_name, author_email) = authors.get(&comment.author_id).map_or_else(
                    || (UNKNOWN_AUTHOR_NAME.to_owned(), UNKNOWN_AUTHOR_EMAIL.to_owned()),
                    |user| (user.display_name(), user.email.to_string()),
                );
                CommentView {
                    comment,
                    author_name,
                    author_email,
                }
            })
            .collect())
    }

    /// Delete one of the caller's own comments.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` (request), `CommentNotFound`, `PermissionDenied`
    /// (not visible, or not the author) or `StoreUnavailable`.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, request_id = %id, comment_id = %comment_id))]
    pub async fn delete_comment(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
        comment_id: CommentId,
    ) -> Result<(), WorkflowError> {
        fetch_visible(self.requests.as_ref(), caller, id).await?;
        let comment = self
            .comments
            .get(id, comment_id)
            .await?
            .ok_or(WorkflowError::CommentNotFound(comment_id))?;
        if comment.author_id != caller.id {
            return Err(WorkflowError::denied("You can only delete your own comments"));
        }
        if !self.comments.delete(id, comment_id).await? {
            return Err(WorkflowError::CommentNotFound(comment_id));
        }
        info!("Comment deleted");
        Ok(())
    }
}

fn describe_comment(content: &str) -> String {
    let preview: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("Added a comment: {preview}...")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::NewRequest;
    use crate::services::testing::Fixture;
    use crate::store::SortOrder;

    async fn request(fx: &Fixture) -> RequestId {
        fx.engine
            .create_request(
                &fx.owner,
                NewRequest {
                    company_name: "Acme".to_string(),
                    ..NewRequest::default()
                },
            )
            .await
            .unwrap()
            .request
            .id
    }

    #[test]
    fn test_preview_truncates_by_characters() {
        let long = "é".repeat(80);
        let description = describe_comment(&long);
        assert_eq!(description, format!("Added a comment: {}...", "é".repeat(50)));
        assert_eq!(describe_comment("ok"), "Added a comment: ok...");
    }

    #[tokio::test]
    async fn test_add_comment_records_activity() {
        let fx = Fixture::new().await;
        let id = request(&fx).await;

        let outcome = fx
            .comments
            .add_comment(&fx.reviewer, &id, "  Looks good  ")
            .await
            .unwrap();
        assert_eq!(outcome.comment.content, "Looks good");
        assert!(outcome.warnings.is_empty());

        let activities = fx
            .stores
            .activities
            .list_by_request(&id, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(activities[0].activity_type, ActivityType::Comment);
        assert_eq!(activities[0].description, "Added a comment: Looks good...");
    }

    #[tokio::test]
    async fn test_add_comment_validation_and_visibility() {
        let fx = Fixture::new().await;
        let id = request(&fx).await;

        let err = fx.comments.add_comment(&fx.owner, &id, "   ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));

        let err = fx
            .comments
            .add_comment(&fx.stranger, &id, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_comment_survives_audit_failure() {
        let fx = Fixture::new().await;
        let id = request(&fx).await;
        fx.memory.fail_activity_appends(true);

        let outcome = fx.comments.add_comment(&fx.owner, &id, "hi").await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(fx.comments.list_comments(&fx.owner, &id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_comments_oldest_first_with_authors() {
        let fx = Fixture::new().await;
        let id = request(&fx).await;
        fx.comments.add_comment(&fx.owner, &id, "first").await.unwrap();
        fx.comments.add_comment(&fx.reviewer, &id, "second").await.unwrap();

        let views = fx.comments.list_comments(&fx.owner, &id).await.unwrap();
        let contents: Vec<&str> = views.iter().map(|v| v.comment.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(views[0].author_name, "Olive Owner");
        assert_eq!(views[1].author_email, "rae@rakwireless.com");
    }

    #[tokio::test]
    async fn test_only_author_deletes_comment() {
        let fx = Fixture::new().await;
        let id = request(&fx).await;
        let comment = fx
            .comments
            .add_comment(&fx.owner, &id, "mine")
            .await
            .unwrap()
            .comment;

        let err = fx
            .comments
            .delete_comment(&fx.admin, &id, comment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        fx.comments.delete_comment(&fx.owner, &id, comment.id).await.unwrap();

        let err = fx
            .comments
            .delete_comment(&fx.owner, &id, comment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CommentNotFound(c) if c == comment.id));
    }
}

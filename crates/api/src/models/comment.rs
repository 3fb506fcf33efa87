//! Comments attached to requests.

use chrono::{DateTime, Utc};

use preconfig_core::{CommentId, RequestId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub request_id: RequestId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub request_id: RequestId,
    pub author_id: UserId,
    pub content: String,
}

/// A comment with its author resolved for display.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author_name: String,
    pub author_email: String,
}

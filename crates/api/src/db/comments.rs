//! Comment repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use preconfig_core::{CommentId, RequestId, UserId};

use super::RepositoryError;
use crate::models::{Comment, NewComment};
use crate::store::CommentStore;

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i32,
    request_id: String,
    author_id: i32,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = RepositoryError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let request_id = RequestId::parse(&row.request_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid request id in comment {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CommentId::new(row.id),
            request_id,
            author_id: UserId::new(row.author_id),
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// Comment store backed by `preconfig.comments`.
#[derive(Debug, Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    #[instrument(skip(self, comment), fields(request_id = %comment.request_id))]
    async fn create(&self, comment: &NewComment) -> Result<Comment, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            INSERT INTO preconfig.comments (request_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, request_id, author_id, content, created_at
            ",
        )
        .bind(comment.request_id.as_str())
        .bind(comment.author_id.as_i32())
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        row.try_into()
    }

    #[instrument(skip(self, request_id), fields(request_id = %request_id))]
    async fn list_by_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, request_id, author_id, content, created_at
            FROM preconfig.comments
            WHERE request_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(request_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, request_id), fields(request_id = %request_id, comment_id = %id))]
    async fn get(
        &self,
        request_id: &RequestId,
        id: CommentId,
    ) -> Result<Option<Comment>, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, request_id, author_id, content, created_at
            FROM preconfig.comments
            WHERE request_id = $1 AND id = $2
            ",
        )
        .bind(request_id.as_str())
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, request_id), fields(request_id = %request_id, comment_id = %id))]
    async fn delete(&self, request_id: &RequestId, id: CommentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM preconfig.comments WHERE request_id = $1 AND id = $2")
            .bind(request_id.as_str())
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

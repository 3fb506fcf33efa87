//! Audit log repository for `PostgreSQL`.
//!
//! Rows are only ever inserted. There is no update or delete path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use preconfig_core::{ActivityId, ActivityType, RequestId, UserId};

use super::RepositoryError;
use crate::models::{Activity, NewActivity};
use crate::store::{ActivityLog, SortOrder};

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i32,
    request_id: String,
    actor_id: i32,
    activity_type: ActivityType,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = RepositoryError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let request_id = RequestId::parse(&row.request_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid request id in activity {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ActivityId::new(row.id),
            request_id,
            actor_id: UserId::new(row.actor_id),
            activity_type: row.activity_type,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Activity log backed by `preconfig.activities`.
#[derive(Debug, Clone)]
pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    #[instrument(skip(self, activity), fields(request_id = %activity.request_id, activity_type = %activity.activity_type))]
    async fn append(&self, activity: &NewActivity) -> Result<Activity, RepositoryError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r"
            INSERT INTO preconfig.activities
                (request_id, actor_id, activity_type, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, request_id, actor_id, activity_type, description, created_at
            ",
        )
        .bind(activity.request_id.as_str())
        .bind(activity.actor_id.as_i32())
        .bind(activity.activity_type)
        .bind(&activity.description)
        .bind(activity.created_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[instrument(skip(self, request_id), fields(request_id = %request_id))]
    async fn list_by_request(
        &self,
        request_id: &RequestId,
        order: SortOrder,
    ) -> Result<Vec<Activity>, RepositoryError> {
        let sql = match order {
            SortOrder::Ascending => {
                r"
                SELECT id, request_id, actor_id, activity_type, description, created_at
                FROM preconfig.activities
                WHERE request_id = $1
                ORDER BY created_at ASC, id ASC
                "
            }
            SortOrder::Descending => {
                r"
                SELECT id, request_id, actor_id, activity_type, description, created_at
                FROM preconfig.activities
                WHERE request_id = $1
                ORDER BY created_at DESC, id DESC
                "
            }
        };

        let rows = sqlx::query_as::<_, ActivityRow>(sql)
            .bind(request_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

//! Request repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use preconfig_core::{RequestId, UserId, WorkflowStatus};

use super::RepositoryError;
use crate::models::{FieldValue, RemovableField, Request, RequestUpdate};
use crate::store::RequestStore;

const COLUMNS: &str = "id, owner_id, company_name, rak_id, status, assignee, config_data, \
                       changes, original_config, tags, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: String,
    owner_id: i32,
    company_name: String,
    rak_id: String,
    status: String,
    assignee: Option<String>,
    config_data: serde_json::Value,
    changes: serde_json::Value,
    original_config: serde_json::Value,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for Request {
    type Error = RepositoryError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let id = RequestId::parse(&row.id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid request id in database: {e}"))
        })?;

        Ok(Self {
            id,
            owner_id: UserId::new(row.owner_id),
            company_name: row.company_name,
            rak_id: row.rak_id,
            status: WorkflowStatus::from_stored(row.status),
            assignee: row.assignee,
            config_data: row.config_data,
            changes: row.changes,
            original_config: row.original_config,
            tags: row.tags,
            created_at: row.created_at,
        })
    }
}

const fn removable_column(field: RemovableField) -> &'static str {
    match field {
        RemovableField::Assignee => "assignee",
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Request store backed by `preconfig.requests`.
#[derive(Debug, Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        clause: &str,
        bind: Option<String>,
    ) -> Result<Vec<Request>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM preconfig.requests {clause} ORDER BY created_at DESC");
        let mut query = sqlx::query_as::<_, RequestRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    #[instrument(skip(self), fields(request_id = %id))]
    async fn get_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM preconfig.requests WHERE id = $1");
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, request), fields(request_id = %request.id))]
    async fn put(&self, request: &Request) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO preconfig.requests
                (id, owner_id, company_name, rak_id, status, assignee,
                 config_data, changes, original_config, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(request.id.as_str())
        .bind(request.owner_id.as_i32())
        .bind(&request.company_name)
        .bind(&request.rak_id)
        .bind(request.status.as_str())
        .bind(request.assignee.as_deref())
        .bind(&request.config_data)
        .bind(&request.changes)
        .bind(&request.original_config)
        .bind(&request.tags)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        Ok(())
    }

    #[instrument(skip(self, update), fields(request_id = %id, fields = update.set.len() + update.remove.len()))]
    async fn update_fields(
        &self,
        id: &RequestId,
        update: &RequestUpdate,
    ) -> Result<Request, RepositoryError> {
        if update.is_empty() {
            return self.get_by_id(id).await?.ok_or(RepositoryError::NotFound);
        }

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE preconfig.requests SET ");
        {
            let mut assignments = builder.separated(", ");
            for value in &update.set {
                match value {
                    FieldValue::Status(status) => {
                        assignments.push("status = ");
                        assignments.push_bind_unseparated(status.as_str().to_owned());
                    }
                    FieldValue::Assignee(assignee) => {
                        assignments.push("assignee = ");
                        assignments.push_bind_unseparated(assignee.clone());
                    }
                    FieldValue::CompanyName(name) => {
                        assignments.push("company_name = ");
                        assignments.push_bind_unseparated(name.clone());
                    }
                    FieldValue::RakId(rak_id) => {
                        assignments.push("rak_id = ");
                        assignments.push_bind_unseparated(rak_id.clone());
                    }
                    FieldValue::ConfigData(data) => {
                        assignments.push("config_data = ");
                        assignments.push_bind_unseparated(data.clone());
                    }
                    FieldValue::Changes(changes) => {
                        assignments.push("changes = ");
                        assignments.push_bind_unseparated(changes.clone());
                    }
                    FieldValue::OriginalConfig(config) => {
                        assignments.push("original_config = ");
                        assignments.push_bind_unseparated(config.clone());
                    }
                    FieldValue::Tags(tags) => {
                        assignments.push("tags = ");
                        assignments.push_bind_unseparated(tags.clone());
                    }
                }
            }
            for field in &update.remove {
                assignments.push(format!("{} = NULL", removable_column(*field)));
            }
            assignments.push("updated_at = NOW()");
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id.as_str().to_owned());
        builder.push(" RETURNING ");
        builder.push(COLUMNS);

        let row = builder
            .build_query_as::<RequestRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    #[instrument(skip(self), fields(request_id = %id))]
    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM preconfig.requests WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_many(&self, ids: &[RequestId]) -> Result<u64, RepositoryError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let result = sqlx::query("DELETE FROM preconfig.requests WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(owner_id = %owner))]
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Request>, RepositoryError> {
        let sql =
            format!("SELECT {COLUMNS} FROM preconfig.requests WHERE owner_id = $1 ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(owner.as_i32())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn list_by_assignee(&self, assignee: &str) -> Result<Vec<Request>, RepositoryError> {
        self.fetch_where("WHERE lower(assignee) = lower($1)", Some(assignee.to_owned()))
            .await
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError> {
        self.fetch_where("", None).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

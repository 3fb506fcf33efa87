//! User directory repository for `PostgreSQL`.
//!
//! Reads go through the [`UserDirectory`] trait. Writes are used by the
//! operator CLI only: the API never creates users or changes roles.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use preconfig_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::{NewUser, UserRecord};
use crate::store::UserDirectory;

const COLUMNS: &str = "id, email, name, role, is_active, created_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: Option<String>,
    role: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// User directory backed by `preconfig.users`.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn create(&self, user: &NewUser) -> Result<UserRecord, RepositoryError> {
        let sql = format!(
            "INSERT INTO preconfig.users (email, name, role) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.email.as_str())
            .bind(user.name.as_deref())
            .bind(user.role.map(Role::as_str))
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        row.try_into()
    }

    /// Make sure `email` exists, is active and holds the `admin` role.
    ///
    /// Existing records keep their name; a missing record is created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn ensure_admin(
        &self,
        email: &Email,
        name: Option<&str>,
    ) -> Result<UserRecord, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO preconfig.users (email, name, role)
            VALUES ($1, $2, 'admin')
            ON CONFLICT ((lower(email))) DO UPDATE
                SET role = 'admin', is_active = TRUE, updated_at = NOW()
            RETURNING {COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        row.try_into()
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM preconfig.users WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM preconfig.users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserRecord>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw: Vec<i32> = ids.iter().map(UserId::as_i32).collect();
        let sql = format!("SELECT {COLUMNS} FROM preconfig.users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&raw)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| UserRecord::try_from(row).map(|user| (user.id, user)))
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_active(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM preconfig.users WHERE is_active ORDER BY email");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

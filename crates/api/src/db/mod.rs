//! Store adapters.
//!
//! # Database: `preconfig` schema
//!
//! ## Tables
//!
//! - `users` - User directory (identity and optional stored role)
//! - `requests` - Configuration-change requests
//! - `activities` - Append-only audit log (no FK, survives request deletion)
//! - `comments` - Comments on requests
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p preconfig-cli -- migrate
//! ```
//!
//! [`MemoryStore`] implements the same traits without a database and is
//! used by tests and the `memory` backend.

pub mod activities;
pub mod comments;
pub mod memory;
pub mod requests;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activities::PgActivityLog;
pub use comments::PgCommentStore;
pub use memory::MemoryStore;
pub use requests::PgRequestStore;
pub use users::PgUserDirectory;

/// `PostgreSQL` SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";
/// `PostgreSQL` SQLSTATE for CHECK constraint violations.
const CHECK_VIOLATION: &str = "23514";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, blank assignee).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store refused the operation without reaching storage.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Classify an sqlx error, mapping constraint violations to `Conflict`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let conflict = err.as_database_error().and_then(|db| {
            let code = db.code()?;
            matches!(code.as_ref(), UNIQUE_VIOLATION | CHECK_VIOLATION)
                .then(|| db.message().to_owned())
        });
        match conflict {
            Some(message) => Self::Conflict(message),
            None => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

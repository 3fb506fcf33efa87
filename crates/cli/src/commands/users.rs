//! User directory commands.
//!
//! The API never writes to the directory. Operators add users here, and
//! `ensure-admin` guarantees a working admin account after a fresh install.
//!
//! # Environment Variables
//!
//! - `PRECONFIG_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use thiserror::Error;

use preconfig_api::db::{PgUserDirectory, RepositoryError, create_pool};
use preconfig_api::models::NewUser;
use preconfig_core::{Email, Role};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, rakwireless, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

async fn directory() -> Result<PgUserDirectory, UserError> {
    let database_url =
        super::database_url().ok_or(UserError::MissingEnvVar("PRECONFIG_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    Ok(PgUserDirectory::new(pool))
}

fn parse_email(email: &str) -> Result<Email, UserError> {
    Email::parse(email).map_err(|e| UserError::InvalidEmail(format!("{email}: {e}")))
}

fn parse_role(role: Option<&str>) -> Result<Option<Role>, UserError> {
    role.map(|r| r.parse().map_err(|_| UserError::InvalidRole(r.to_owned())))
        .transpose()
}

/// Create a new directory user.
///
/// Without a role the user's role is derived from their email domain on
/// every request.
///
/// # Errors
///
/// Returns `UserError` for invalid input, a duplicate email or a database
/// failure.
pub async fn create_user(
    email: &str,
    name: Option<&str>,
    role: Option<&str>,
) -> Result<(), UserError> {
    let user = NewUser {
        email: parse_email(email)?,
        name: name.map(str::to_owned),
        role: parse_role(role)?,
    };

    let created = directory().await?.create(&user).await?;
    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        created.id,
        created.email,
        created.resolved_role()
    );
    Ok(())
}

/// Create the admin user, or promote and reactivate it if it exists.
///
/// # Errors
///
/// Returns `UserError` for an invalid email or a database failure.
pub async fn ensure_admin(email: &str, name: &str) -> Result<(), UserError> {
    let email = parse_email(email)?;
    let admin = directory().await?.ensure_admin(&email, Some(name)).await?;
    tracing::info!("Admin user ready: ID {}, Email {}", admin.id, admin.email);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), None);
        assert_eq!(parse_role(Some("admin")).unwrap(), Some(Role::Admin));
        assert!(matches!(
            parse_role(Some("superuser")),
            Err(UserError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_parse_email() {
        assert!(parse_email("ops@rakwireless.com").is_ok());
        assert!(matches!(
            parse_email("not-an-email"),
            Err(UserError::InvalidEmail(_))
        ));
    }
}

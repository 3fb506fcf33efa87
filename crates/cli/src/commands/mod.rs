//! CLI command implementations.

pub mod migrate;
pub mod users;

use secrecy::SecretString;

/// Database URL from `PRECONFIG_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("PRECONFIG_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

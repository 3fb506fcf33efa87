//! User directory types.
//!
//! Credentials live with the authenticating gateway. The directory only
//! records who a caller is and, optionally, which role they were given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preconfig_core::{Email, Role, UserId};

/// Display name used when neither a name nor an email local part exists.
const DEFAULT_DISPLAY_NAME: &str = "User";

/// A user record as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    /// Raw stored role. Unknown values are ignored by the resolver.
    pub role: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Effective role.
    #[must_use]
    pub fn resolved_role(&self) -> Role {
        Role::resolve(self.email.as_str(), self.role.as_deref())
    }

    /// Name for lists and pickers: the trimmed name, else the email local
    /// part, else `"User"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(Some(self.email.local_part())))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_owned()
    }

    /// Name used inside activity descriptions: the name, else the email.
    #[must_use]
    pub fn operator_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or_else(|| self.email.as_str())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The resolved identity of the caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    /// Same fallbacks as [`UserRecord::display_name`].
    #[must_use]
    pub fn display_name(&self) -> String {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(Some(self.email.local_part())))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_owned()
    }

    /// Name used inside activity descriptions: the name, else the email.
    #[must_use]
    pub fn operator_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or_else(|| self.email.as_str())
    }
}

impl From<&UserRecord> for CurrentUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            name: record.name.clone(),
            role: record.resolved_role(),
        }
    }
}

/// Input for creating a directory entry.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// Directory entry as exposed to reviewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            name: record.display_name(),
            role: record.resolved_role(),
            is_active: record.is_active,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(email: &str, name: Option<&str>, role: Option<&str>) -> UserRecord {
        UserRecord {
            id: UserId::new(1),
            email: Email::parse(email).unwrap(),
            name: name.map(String::from),
            role: role.map(String::from),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(record("j@x.com", Some(" Jane "), None).display_name(), "Jane");
        assert_eq!(record("jane.doe@x.com", Some("  "), None).display_name(), "jane.doe");
        assert_eq!(record("jane.doe@x.com", None, None).display_name(), "jane.doe");
    }

    #[test]
    fn test_operator_name_prefers_name_then_email() {
        assert_eq!(record("j@x.com", Some("Jane"), None).operator_name(), "Jane");
        assert_eq!(record("j@x.com", None, None).operator_name(), "j@x.com");
    }

    #[test]
    fn test_current_user_resolves_role() {
        let reviewer = CurrentUser::from(&record("ops@rakwireless.com", None, None));
        assert_eq!(reviewer.role, Role::Rakwireless);

        let promoted = CurrentUser::from(&record("c@x.com", None, Some("admin")));
        assert_eq!(promoted.role, Role::Admin);
    }
}

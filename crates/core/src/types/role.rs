//! Caller roles and the role resolver.

use serde::{Deserialize, Serialize};

/// Email domain whose members are treated as reviewers by default.
pub const REVIEWER_DOMAIN_SUFFIX: &str = "@rakwireless.com";

/// Role governing what a caller may see and change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// External customer. Sees and edits only their own requests.
    #[default]
    User,
    /// Internal reviewer. Sees every request and drives workflow status.
    Rakwireless,
    /// Administrator. Reviewer rights plus content edits and deletes on
    /// any request.
    Admin,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::User, Self::Rakwireless, Self::Admin];

    /// Resolve the effective role of an identity.
    ///
    /// A valid stored role always wins. Without one, addresses ending in
    /// `@rakwireless.com` (any case) resolve to [`Role::Rakwireless`] and
    /// everything else, including malformed input, to [`Role::User`].
    ///
    /// ```
    /// use preconfig_core::Role;
    ///
    /// assert_eq!(Role::resolve("x@rakwireless.com", None), Role::Rakwireless);
    /// assert_eq!(Role::resolve("x@rakwireless.com", Some("user")), Role::User);
    /// assert_eq!(Role::resolve("x@other.com", Some("superuser")), Role::User);
    /// ```
    #[must_use]
    pub fn resolve(email: &str, stored_role: Option<&str>) -> Self {
        if let Some(role) = stored_role.and_then(|r| r.parse().ok()) {
            return role;
        }
        if email
            .trim()
            .to_ascii_lowercase()
            .ends_with(REVIEWER_DOMAIN_SUFFIX)
        {
            return Self::Rakwireless;
        }
        Self::User
    }

    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Rakwireless => "rakwireless",
            Self::Admin => "admin",
        }
    }

    /// Sees every request, not only owned ones.
    #[must_use]
    pub const fn can_view_all(self) -> bool {
        matches!(self, Self::Rakwireless | Self::Admin)
    }

    /// Deletes requests regardless of ownership.
    #[must_use]
    pub const fn can_delete_any(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Changes workflow status regardless of ownership.
    #[must_use]
    pub const fn can_edit_workflow_status(self) -> bool {
        matches!(self, Self::Rakwireless | Self::Admin)
    }

    /// Manages other users' roles.
    ///
    /// Kept for the data model only. The API refuses user management for
    /// every role without consulting this predicate.
    #[must_use]
    pub const fn can_manage_users(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "rakwireless" => Ok(Self::Rakwireless),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

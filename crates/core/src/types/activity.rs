//! Activity kinds recorded in the audit log.

use serde::{Deserialize, Serialize};

/// Kind of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "preconfig.activity_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// The request was submitted.
    Created,
    /// Workflow status moved to a different value.
    StatusChanged,
    /// The request was (re)assigned to someone.
    Assigned,
    /// The assignee was cleared.
    Unassigned,
    /// A comment was posted.
    Comment,
}

impl ActivityType {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::Comment => "comment",
        }
    }

    /// Whether this kind describes an assignment transition.
    #[must_use]
    pub const fn is_assignment(self) -> bool {
        matches!(self, Self::Assigned | Self::Unassigned)
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "status_changed" => Ok(Self::StatusChanged),
            "assigned" => Ok(Self::Assigned),
            "unassigned" => Ok(Self::Unassigned),
            "comment" => Ok(Self::Comment),
            _ => Err(format!("invalid activity type: {s}")),
        }
    }
}

//! Audit log records.

use chrono::{DateTime, Utc};

use preconfig_core::{ActivityId, ActivityType, RequestId, UserId};

/// Fallback author name when the acting user no longer resolves.
pub const UNKNOWN_AUTHOR_NAME: &str = "Unknown User";
/// Fallback author email when the acting user no longer resolves.
pub const UNKNOWN_AUTHOR_EMAIL: &str = "unknown@example.com";

/// An immutable, stored activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: ActivityId,
    pub request_id: RequestId,
    pub actor_id: UserId,
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An activity about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub request_id: RequestId,
    pub actor_id: UserId,
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewActivity {
    /// Stamp a new activity with the current time.
    #[must_use]
    pub fn now(
        request_id: RequestId,
        actor_id: UserId,
        activity_type: ActivityType,
        description: String,
    ) -> Self {
        Self {
            request_id,
            actor_id,
            activity_type,
            description,
            created_at: Utc::now(),
        }
    }
}

/// An activity with its author resolved for display.
#[derive(Debug, Clone)]
pub struct ActivityView {
    pub activity: Activity,
    pub author_name: String,
    pub author_email: String,
}

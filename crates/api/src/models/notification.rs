//! Notification feed entries.

use chrono::{DateTime, Utc};

use preconfig_core::{ActivityId, ActivityType, RequestId};

/// Fallback actor name in the feed.
pub const UNKNOWN_ACTOR_NAME: &str = "Unknown";
/// Fallback actor email in the feed.
pub const UNKNOWN_ACTOR_EMAIL: &str = "unknown@example.com";

/// One feed item: the latest activity of a given type on a given request.
///
/// Derived on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEntry {
    pub activity_id: ActivityId,
    pub request_id: RequestId,
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub actor_name: String,
    pub actor_email: String,
}

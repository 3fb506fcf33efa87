//! Notification Aggregator.
//!
//! The feed is a view recomputed on every read from the requests a caller
//! owns or is assigned to. Nothing is persisted or consumed: building the
//! feed twice against the same data yields the same entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};

use preconfig_core::{ActivityType, RequestId, UserId};

use super::{WorkflowError, distinct_users};
use crate::models::notification::{UNKNOWN_ACTOR_EMAIL, UNKNOWN_ACTOR_NAME};
use crate::models::{Activity, CurrentUser, NotificationEntry, UserRecord};
use crate::store::{ActivityLog, RequestStore, SortOrder, Stores, UserDirectory};

/// Builds per-user notification feeds over the activity log.
#[derive(Clone)]
pub struct NotificationAggregator {
    requests: Arc<dyn RequestStore>,
    activities: Arc<dyn ActivityLog>,
    users: Arc<dyn UserDirectory>,
}

impl NotificationAggregator {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            requests: Arc::clone(&stores.requests),
            activities: Arc::clone(&stores.activities),
            users: Arc::clone(&stores.users),
        }
    }

    /// Feed for `caller`, newest first, one entry per (request, type).
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if any store read fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn build_feed(
        &self,
        caller: &CurrentUser,
    ) -> Result<Vec<NotificationEntry>, WorkflowError> {
        let (owned, assigned) = futures::try_join!(
            self.requests.list_by_owner(caller.id),
            self.requests.list_by_assignee(caller.email.as_str()),
        )?;
        let owned: HashSet<RequestId> = owned.into_iter().map(|r| r.id).collect();
        let assigned: HashSet<RequestId> = assigned.into_iter().map(|r| r.id).collect();

        let mut ids: Vec<&RequestId> = owned.union(&assigned).collect();
        ids.sort();

        let activities: Vec<Activity> = try_join_all(
            ids.iter()
                .map(|id| self.activities.list_by_request(id, SortOrder::Ascending)),
        )
        .await?
        .into_iter()
        .flatten()
        .collect();

        let email = caller.email.as_str().to_ascii_lowercase();
        let scope = FeedScope {
            email: &email,
            owned: &owned,
            assigned: &assigned,
        };
        let latest = latest_per_kind(activities.into_iter().filter(|a| scope.keeps(a)));

        let actors = self
            .users
            .get_many(&distinct_users(latest.iter().map(|a| a.actor_id)))
            .await?;

        debug!(
            requests = ids.len(),
            entries = latest.len(),
            "Notification feed built"
        );
        Ok(latest
            .into_iter()
            .map(|activity| to_entry(activity, &actors))
            .collect())
    }
}

/// What the caller is entitled to hear about.
struct FeedScope<'a> {
    /// Lowercased caller email.
    email: &'a str,
    owned: &'a HashSet<RequestId>,
    assigned: &'a HashSet<RequestId>,
}

impl FeedScope<'_> {
    fn keeps(&self, activity: &Activity) -> bool {
        if self.owned.contains(&activity.request_id) {
            return matches!(
                activity.activity_type,
                ActivityType::Assigned | ActivityType::StatusChanged
            );
        }
        activity.activity_type.is_assignment()
            && (activity.description.to_ascii_lowercase().contains(self.email)
                || self.assigned.contains(&activity.request_id))
    }
}

/// Keep the latest activity per (request, type), newest first.
///
/// Ties on timestamp break on the higher activity id, then the output is
/// ordered by timestamp descending, request id, then activity id.
fn latest_per_kind(activities: impl IntoIterator<Item = Activity>) -> Vec<Activity> {
    let mut latest: HashMap<(RequestId, ActivityType), Activity> = HashMap::new();
    for activity in activities {
        let key = (activity.request_id.clone(), activity.activity_type);
        match latest.get(&key) {
            Some(kept) if (kept.created_at, kept.id) >= (activity.created_at, activity.id) => {}
            _ => {
                latest.insert(key, activity);
            }
        }
    }

    let mut entries: Vec<Activity> = latest.into_values().collect();
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.request_id.cmp(&b.request_id))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries
}

fn to_entry(activity: Activity, actors: &HashMap<UserId, UserRecord>) -> NotificationEntry {
    let (actor_name, actor_email) = actors.get(&activity.actor_id).map_or_else(
        || (UNKNOWN_ACTOR_NAME.to_owned(), UNKNOWN_ACTOR_EMAIL.to_owned()),
        |user| (user.display_name(), user.email.to_string()),
    );
    NotificationEntry {
        activity_id: activity.id,
        request_id: activity.request_id,
        activity_type: activity.activity_type,
        description: activity.description,
        created_at: activity.created_at,
        actor_name,
        actor_email,
    }
}

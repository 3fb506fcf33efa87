//! Workflow Engine.
//!
//! Every mutation of a request goes through [`WorkflowEngine`]:
//!
//! 1. read the current request (`NotFound` if absent)
//! 2. check every proposed field against the permission matrix, failing the
//!    whole call on the first denied field
//! 3. capture the old `status` and `assignee`
//! 4. apply all changes in one store write
//! 5. diff old against new and append one activity per observable change
//!
//! Step 5 is best-effort. Once the write in step 4 has succeeded the call is
//! committed: append failures are logged and returned as warnings.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, instrument, warn};

use preconfig_core::{ActivityType, RequestAccess, RequestField, RequestId, WorkflowStatus};

use super::{WorkflowError, distinct_users};
use crate::db::RepositoryError;
use crate::models::activity::{UNKNOWN_AUTHOR_EMAIL, UNKNOWN_AUTHOR_NAME};
use crate::models::request::normalize_assignee;
use crate::models::{
    Activity, ActivityView, CurrentUser, FieldValue, NewActivity, NewRequest, RemovableField,
    Request, RequestPatch, RequestUpdate, RequestView,
};
use crate::store::{ActivityLog, RequestStore, SortOrder, Stores, UserDirectory};

/// Result of [`WorkflowEngine::create_request`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub request: Request,
    /// The `created` activity, unless recording it failed.
    pub activity: Option<Activity>,
    pub warnings: Vec<String>,
}

/// Result of [`WorkflowEngine::apply_update`].
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The request as stored after the update.
    pub request: Request,
    pub applied_fields: Vec<RequestField>,
    /// Activities that were recorded. Empty for a no-op update.
    pub activities: Vec<Activity>,
    pub warnings: Vec<String>,
}

/// Result of [`WorkflowEngine::batch_delete_requests`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    pub requested: usize,
    pub deleted: u64,
}

/// A validated patch, ready for the store, with the values needed for the
/// post-write diff.
#[derive(Debug)]
struct PlannedUpdate {
    update: RequestUpdate,
    status: Option<WorkflowStatus>,
    /// `Some(None)` clears the assignee.
    assignee: Option<Option<String>>,
}

/// Orchestrates request mutation, permission checks and audit emission.
#[derive(Clone)]
pub struct WorkflowEngine {
    requests: Arc<dyn RequestStore>,
    activities: Arc<dyn ActivityLog>,
    users: Arc<dyn UserDirectory>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            requests: Arc::clone(&stores.requests),
            activities: Arc::clone(&stores.activities),
            users: Arc::clone(&stores.users),
        }
    }

    /// Create a request owned by `caller`.
    ///
    /// Always permitted. The request starts at the initial status with no
    /// assignee, and exactly one `created` activity is recorded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank company name and
    /// `StoreUnavailable` if the request cannot be stored.
    #[instrument(skip(self, caller, new), fields(user_id = %caller.id))]
    pub async fn create_request(
        &self,
        caller: &CurrentUser,
        new: NewRequest,
    ) -> Result<CreateOutcome, WorkflowError> {
        let company_name = new.company_name.trim();
        if company_name.is_empty() {
            return Err(WorkflowError::invalid("companyName cannot be blank"));
        }

        let request = Request {
            id: RequestId::generate(),
            owner_id: caller.id,
            company_name: company_name.to_owned(),
            rak_id: new.rak_id,
            status: WorkflowStatus::initial(),
            assignee: None,
            config_data: new.config_data,
            changes: new.changes,
            original_config: new.original_config,
            tags: new.tags,
            created_at: Utc::now(),
        };
        self.requests.put(&request).await?;
        info!(request_id = %request.id, "Request created");

        let mut warnings = Vec::new();
        let activity = record_activity(
            self.activities.as_ref(),
            NewActivity::now(
                request.id.clone(),
                caller.id,
                ActivityType::Created,
                describe_created(caller.operator_name(), &request.company_name),
            ),
            &mut warnings,
        )
        .await;

        Ok(CreateOutcome {
            request,
            activity,
            warnings,
        })
    }

    /// Get one request the caller may view.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist and
    /// `PermissionDenied` if it exists but is not visible to the caller.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, request_id = %id))]
    pub async fn get_request(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
    ) -> Result<RequestView, WorkflowError> {
        let request = fetch_visible(self.requests.as_ref(), caller, id).await?;
        let creator_email = self
            .users
            .get_by_id(request.owner_id)
            .await?
            .map(|user| user.email);

        Ok(RequestView {
            request,
            creator_email,
        })
    }

    /// Every request for reviewers, otherwise the caller's own, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if a store read fails.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, role = %caller.role))]
    pub async fn list_requests(
        &self,
        caller: &CurrentUser,
    ) -> Result<Vec<RequestView>, WorkflowError> {
        let mut requests = if caller.role.can_view_all() {
            self.requests.list_all().await?
        } else {
            self.requests.list_by_owner(caller.id).await?
        };
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let owners = self
            .users
            .get_many(&distinct_users(requests.iter().map(|r| r.owner_id)))
            .await?;

        Ok(requests
            .into_iter()
            .map(|request| {
                let creator_email = owners.get(&request.owner_id).map(|u| u.email.clone());
                RequestView {
                    request,
                    creator_email,
                }
            })
            .collect())
    }

    /// Apply `patch` to a request on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the request does not exist (or vanished before the write)
    /// - `PermissionDenied` if any proposed field is not editable by the caller;
    ///   nothing is applied
    /// - `InvalidInput` if the patch is empty or carries a blank value
    /// - `StoreUnavailable` if the request write fails
    #[instrument(skip(self, caller, patch), fields(user_id = %caller.id, request_id = %id))]
    pub async fn apply_update(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
        patch: RequestPatch,
    ) -> Result<UpdateOutcome, WorkflowError> {
        let current = fetch(self.requests.as_ref(), id).await?;

        let proposed = patch.fields();
        if let Some(field) = access_for(caller, &current).first_denied(proposed.iter().copied()) {
            warn!(field = %field, role = %caller.role, "Update denied");
            return Err(WorkflowError::denied(denial_message(field)));
        }
        if proposed.is_empty() {
            return Err(WorkflowError::invalid("No fields to update"));
        }
        let mut plan = plan_update(patch)?;
        let assigned_name = self.resolve_assignee(&mut plan).await;

        let old_status = current.status.clone();
        let old_assignee = normalize_assignee(current.assignee.as_deref());

        let updated = self
            .requests
            .update_fields(id, &plan.update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => WorkflowError::NotFound(id.clone()),
                other => WorkflowError::StoreUnavailable(other),
            })?;

        let operator = caller.operator_name();
        let mut pending = Vec::new();

        if let Some(new_status) = plan.status.as_ref().filter(|s| **s != old_status) {
            pending.push(NewActivity::now(
                id.clone(),
                caller.id,
                ActivityType::StatusChanged,
                describe_status_change(operator, id, &old_status, new_status),
            ));
        }

        if let Some(new_assignee) = plan
            .assignee
            .filter(|new| !same_identity(new.as_deref(), old_assignee.as_deref()))
        {
            let activity = match new_assignee {
                Some(target) => NewActivity::now(
                    id.clone(),
                    caller.id,
                    ActivityType::Assigned,
                    describe_assigned(operator, id, assigned_name.as_deref().unwrap_or(&target)),
                ),
                None => {
                    let former = match old_assignee.as_deref() {
                        Some(identity) => Some(self.assignee_name(identity).await),
                        None => None,
                    };
                    NewActivity::now(
                        id.clone(),
                        caller.id,
                        ActivityType::Unassigned,
                        describe_unassigned(operator, id, former.as_deref()),
                    )
                }
            };
            pending.push(activity);
        }

        let mut warnings = Vec::new();
        let mut activities = Vec::with_capacity(pending.len());
        for activity in pending {
            if let Some(stored) =
                record_activity(self.activities.as_ref(), activity, &mut warnings).await
            {
                activities.push(stored);
            }
        }

        info!(
            fields = ?proposed,
            activities = activities.len(),
            warnings = warnings.len(),
            "Request updated"
        );

        Ok(UpdateOutcome {
            request: updated,
            applied_fields: proposed,
            activities,
            warnings,
        })
    }

    /// Delete a request. No activity is recorded; existing activities for
    /// the request are kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied` (neither owner nor admin) or
    /// `StoreUnavailable`.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, request_id = %id))]
    pub async fn delete_request(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
    ) -> Result<(), WorkflowError> {
        let request = fetch(self.requests.as_ref(), id).await?;
        if !access_for(caller, &request).can_delete() {
            return Err(WorkflowError::denied("You can only delete your own requests"));
        }
        if !self.requests.delete(id).await? {
            return Err(WorkflowError::NotFound(id.clone()));
        }
        info!("Request deleted");
        Ok(())
    }

    /// Delete several requests, all or nothing.
    ///
    /// Every id is checked before anything is deleted. Duplicate ids are
    /// deleted once but still counted as requested.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty list
    /// - `NotFound` naming the first id that does not exist
    /// - `PermissionDenied` if any request is not deletable by the caller
    /// - `StoreUnavailable` if a store call fails
    #[instrument(skip(self, caller, ids), fields(user_id = %caller.id, count = ids.len()))]
    pub async fn batch_delete_requests(
        &self,
        caller: &CurrentUser,
        ids: Vec<RequestId>,
    ) -> Result<BatchDeleteOutcome, WorkflowError> {
        if ids.is_empty() {
            return Err(WorkflowError::invalid("No request IDs provided"));
        }
        let requested = ids.len();

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<RequestId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

        let fetched = try_join_all(unique.iter().map(|id| self.requests.get_by_id(id))).await?;
        if let Some((missing, _)) = unique.iter().zip(&fetched).find(|(_, r)| r.is_none()) {
            return Err(WorkflowError::NotFound(missing.clone()));
        }
        if fetched
            .iter()
            .flatten()
            .any(|request| !access_for(caller, request).can_delete())
        {
            return Err(WorkflowError::denied(
                "Some requests cannot be deleted: you can only delete your own requests",
            ));
        }

        let deleted = self.requests.delete_many(&unique).await?;
        info!(requested, deleted, "Requests deleted");
        Ok(BatchDeleteOutcome { requested, deleted })
    }

    /// Audit trail of one request, newest first, with authors resolved.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied` (not visible) or
    /// `StoreUnavailable`.
    #[instrument(skip(self, caller), fields(user_id = %caller.id, request_id = %id))]
    pub async fn list_activities(
        &self,
        caller: &CurrentUser,
        id: &RequestId,
    ) -> Result<Vec<ActivityView>, WorkflowError> {
        let request = fetch_visible(self.requests.as_ref(), caller, id).await?;
        let activities = self
            .activities
            .list_by_request(&request.id, SortOrder::Descending)
            .await?;
        let authors = self
            .users
            .get_many(&distinct_users(activities.iter().map(|a| a.actor_id)))
            .await?;

        Ok(activities
            .into_iter()
            .map(|activity| {
                let (author_name, author_email) = authors.get(&activity.actor_id).map_or_else(
                    || (UNKNOWN_AUTHOR_NAME.to_owned(), UNKNOWN_AUTHOR_EMAIL.to_owned()),
                    |user| (user.display_name(), user.email.to_string()),
                );
                ActivityView {
                    activity,
                    author_name,
                    author_email,
                }
            })
            .collect())
    }

    /// Replace a proposed assignee with the directory's spelling of that
    /// identity and return the name for the activity description.
    ///
    /// Identities the directory does not know are stored as given.
    async fn resolve_assignee(&self, plan: &mut PlannedUpdate) -> Option<String> {
        let target = plan.assignee.as_ref()?.as_deref()?;
        let user = match self.users.get_by_email(target).await {
            Ok(Some(user)) => user,
            Ok(None) => return Some(target.to_owned()),
            Err(error) => {
                warn!(error = %error, "Failed to resolve assignee name");
                return Some(target.to_owned());
            }
        };

        let canonical = user.email.as_str().to_owned();
        for value in &mut plan.update.set {
            if let FieldValue::Assignee(identity) = value {
                identity.clone_from(&canonical);
            }
        }
        plan.assignee = Some(Some(canonical));
        Some(user.operator_name().to_owned())
    }

    /// Name of an assignee for activity descriptions, falling back to the
    /// raw identity.
    async fn assignee_name(&self, identity: &str) -> String {
        match self.users.get_by_email(identity).await {
            Ok(Some(user)) => user.operator_name().to_owned(),
            Ok(None) => identity.to_owned(),
            Err(error) => {
                warn!(error = %error, "Failed to resolve assignee name");
                identity.to_owned()
            }
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn access_for(caller: &CurrentUser, request: &Request) -> RequestAccess {
    RequestAccess::new(caller.role, request.is_owned_by(caller.id))
}

pub(crate) async fn fetch(
    requests: &dyn RequestStore,
    id: &RequestId,
) -> Result<Request, WorkflowError> {
    requests
        .get_by_id(id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound(id.clone()))
}

/// Fetch a request and require view permission on it.
pub(crate) async fn fetch_visible(
    requests: &dyn RequestStore,
    caller: &CurrentUser,
    id: &RequestId,
) -> Result<Request, WorkflowError> {
    let request = fetch(requests, id).await?;
    if !access_for(caller, &request).can_view() {
        return Err(WorkflowError::denied(
            "You do not have permission to view this request",
        ));
    }
    Ok(request)
}

/// Append an activity, downgrading failure to a logged warning.
pub(crate) async fn record_activity(
    log: &dyn ActivityLog,
    activity: NewActivity,
    warnings: &mut Vec<String>,
) -> Option<Activity> {
    match log.append(&activity).await {
        Ok(stored) => Some(stored),
        Err(error) => {
            warn!(
                request_id = %activity.request_id,
                activity_type = %activity.activity_type,
                error = %error,
                "Failed to record activity"
            );
            warnings.push(format!(
                "{} activity was not recorded: {error}",
                activity.activity_type
            ));
            None
        }
    }
}

fn denial_message(field: RequestField) -> &'static str {
    match field {
        RequestField::Status => "Only RAK Wireless employees can update workflow status",
        RequestField::Assignee => "You cannot change the assignee of this request",
        _ => "You can only edit your own requests",
    }
}

fn plan_update(patch: RequestPatch) -> Result<PlannedUpdate, WorkflowError> {
    let mut update = RequestUpdate::default();

    let status = match patch.status {
        Some(raw) => {
            let status = WorkflowStatus::parse(&raw)
                .ok_or_else(|| WorkflowError::invalid("status cannot be blank"))?;
            update.set.push(FieldValue::Status(status.clone()));
            Some(status)
        }
        None => None,
    };

    let assignee = patch.assignee.map(|change| {
        let normalized = normalize_assignee(change.value());
        match &normalized {
            Some(identity) => update.set.push(FieldValue::Assignee(identity.clone())),
            None => update.remove.push(RemovableField::Assignee),
        }
        normalized
    });

    if let Some(name) = patch.company_name {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::invalid("companyName cannot be blank"));
        }
        update.set.push(FieldValue::CompanyName(name.to_owned()));
    }
    if let Some(rak_id) = patch.rak_id {
        update.set.push(FieldValue::RakId(rak_id));
    }
    if let Some(data) = patch.config_data {
        update.set.push(FieldValue::ConfigData(data));
    }
    if let Some(changes) = patch.changes {
        update.set.push(FieldValue::Changes(changes));
    }
    if let Some(config) = patch.original_config {
        update.set.push(FieldValue::OriginalConfig(config));
    }
    if let Some(tags) = patch.tags {
        update.set.push(FieldValue::Tags(tags));
    }

    Ok(PlannedUpdate {
        update,
        status,
        assignee,
    })
}

// =============================================================================
// Activity descriptions
// =============================================================================

fn describe_created(operator: &str, company_name: &str) -> String {
    format!("Request created by {operator} for {company_name}")
}

fn describe_status_change(
    operator: &str,
    id: &RequestId,
    old: &WorkflowStatus,
    new: &WorkflowStatus,
) -> String {
    format!("{operator} updated workflow process of request {id} from '{old}' to '{new}'")
}

/// Assignee identities compare without regard to ASCII case.
fn same_identity(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

fn describe_assigned(operator: &str, id: &RequestId, assignee: &str) -> String {
    format!("{operator} assigned request {id} to {assignee}")
}

fn describe_unassigned(operator: &str, id: &RequestId, former: Option<&str>) -> String {
    match former {
        Some(name) => format!("{operator} unassigned request {id} from {name}"),
        None => format!("{operator} unassigned this request"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use preconfig_core::Role;
    use serde_json::json;

    use super::*;
    use crate::models::AssigneeChange;
    use crate::services::testing::Fixture;

    fn new_request(company: &str) -> NewRequest {
        NewRequest {
            company_name: company.to_string(),
            rak_id: "RAK-7".to_string(),
            config_data: json!({"band": "EU868"}),
            ..NewRequest::default()
        }
    }

    fn status(value: &str) -> RequestPatch {
        RequestPatch {
            status: Some(value.to_string()),
            ..RequestPatch::default()
        }
    }

    fn assign(value: &str) -> RequestPatch {
        RequestPatch {
            assignee: Some(AssigneeChange::from_input(value)),
            ..RequestPatch::default()
        }
    }

    async fn created(fx: &Fixture) -> Request {
        fx.engine
            .create_request(&fx.owner, new_request("Acme"))
            .await
            .unwrap()
            .request
    }

    async fn activity_types(fx: &Fixture, id: &RequestId) -> Vec<ActivityType> {
        fx.stores
            .activities
            .list_by_request(id, SortOrder::Ascending)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.activity_type)
            .collect()
    }

    // =========================================================================
    // Creation
    // =========================================================================

    #[tokio::test]
    async fn test_create_starts_open_and_unassigned() {
        let fx = Fixture::new().await;
        let outcome = fx
            .engine
            .create_request(&fx.owner, new_request("  Acme  "))
            .await
            .unwrap();

        assert_eq!(outcome.request.status.as_str(), "Open");
        assert_eq!(outcome.request.assignee, None);
        assert_eq!(outcome.request.company_name, "Acme");
        assert_eq!(outcome.request.owner_id, fx.owner.id);
        assert!(outcome.warnings.is_empty());

        let activity = outcome.activity.unwrap();
        assert_eq!(activity.activity_type, ActivityType::Created);
        assert_eq!(activity.description, "Request created by Olive Owner for Acme");
        assert_eq!(
            activity_types(&fx, &outcome.request.id).await,
            vec![ActivityType::Created]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_blank_company() {
        let fx = Fixture::new().await;
        let err = fx
            .engine
            .create_request(&fx.owner, new_request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_survives_audit_failure() {
        let fx = Fixture::new().await;
        fx.memory.fail_activity_appends(true);
        let outcome = fx
            .engine
            .create_request(&fx.owner, new_request("Acme"))
            .await
            .unwrap();

        assert!(outcome.activity.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(
            fx.stores
                .requests
                .get_by_id(&outcome.request.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    // =========================================================================
    // Status
    // =========================================================================

    #[tokio::test]
    async fn test_status_noop_emits_nothing() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, status("Open"))
            .await
            .unwrap();

        assert_eq!(outcome.applied_fields, vec![RequestField::Status]);
        assert!(outcome.activities.is_empty());
        assert_eq!(activity_types(&fx, &request.id).await, vec![ActivityType::Created]);
    }

    #[tokio::test]
    async fn test_status_change_emits_one_activity() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, status(" InReview "))
            .await
            .unwrap();

        assert_eq!(outcome.request.status.as_str(), "InReview");
        assert_eq!(outcome.activities.len(), 1);
        let activity = &outcome.activities[0];
        assert_eq!(activity.activity_type, ActivityType::StatusChanged);
        assert_eq!(
            activity.description,
            format!(
                "Rae Reviewer updated workflow process of request {} from 'Open' to 'InReview'",
                request.id
            )
        );
    }

    #[tokio::test]
    async fn test_owner_without_workflow_authority_cannot_change_status() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let err = fx
            .engine
            .apply_update(&fx.owner, &request.id, status("Done"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_blank_status_is_invalid() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let err = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, status("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    // =========================================================================
    // Assignee
    // =========================================================================

    #[tokio::test]
    async fn test_assign_uses_display_name() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign(fx.assignee.email.as_str()))
            .await
            .unwrap();

        assert_eq!(
            outcome.request.assignee.as_deref(),
            Some(fx.assignee.email.as_str())
        );
        assert_eq!(outcome.activities.len(), 1);
        assert_eq!(outcome.activities[0].activity_type, ActivityType::Assigned);
        assert_eq!(
            outcome.activities[0].description,
            format!("Rae Reviewer assigned request {} to Ada Assignee", request.id)
        );
    }

    #[tokio::test]
    async fn test_assign_unknown_identity_uses_raw_value() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.owner, &request.id, assign("  ghost@example.com "))
            .await
            .unwrap();

        assert_eq!(outcome.request.assignee.as_deref(), Some("ghost@example.com"));
        assert!(outcome.activities[0].description.ends_with("to ghost@example.com"));
    }

    #[tokio::test]
    async fn test_clear_variants_are_equivalent() {
        for clear in ["", "   ", "Unassign", "UNASSIGN"] {
            let fx = Fixture::new().await;
            let request = created(&fx).await;
            fx.engine
                .apply_update(&fx.reviewer, &request.id, assign(fx.assignee.email.as_str()))
                .await
                .unwrap();

            let outcome = fx
                .engine
                .apply_update(&fx.reviewer, &request.id, assign(clear))
                .await
                .unwrap();

            assert_eq!(outcome.request.assignee, None, "{clear:?}");
            assert_eq!(outcome.activities.len(), 1, "{clear:?}");
            assert_eq!(outcome.activities[0].activity_type, ActivityType::Unassigned);
            assert_eq!(
                outcome.activities[0].description,
                format!("Rae Reviewer unassigned request {} from Ada Assignee", request.id)
            );
            assert!(
                fx.stores
                    .requests
                    .list_by_assignee("")
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn test_clearing_unassigned_request_is_noop() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign("unassign"))
            .await
            .unwrap();
        assert!(outcome.activities.is_empty());
    }

    #[tokio::test]
    async fn test_reassign_emits_single_assigned() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        fx.engine
            .apply_update(&fx.reviewer, &request.id, assign("a@rakwireless.com"))
            .await
            .unwrap();

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign("b@rakwireless.com"))
            .await
            .unwrap();

        let types: Vec<_> = outcome.activities.iter().map(|a| a.activity_type).collect();
        assert_eq!(types, vec![ActivityType::Assigned]);
    }

    #[tokio::test]
    async fn test_assignee_is_stored_in_directory_spelling() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign("Ada@RAKwireless.com"))
            .await
            .unwrap();
        assert_eq!(
            outcome.request.assignee.as_deref(),
            Some(fx.assignee.email.as_str())
        );
        assert!(outcome.activities[0].description.ends_with("to Ada Assignee"));

        let again = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign("ADA@rakwireless.com"))
            .await
            .unwrap();
        assert!(again.activities.is_empty());
    }

    #[test]
    fn test_same_identity_ignores_case() {
        assert!(same_identity(Some("Ada@X.com"), Some("ada@x.com")));
        assert!(same_identity(None, None));
        assert!(!same_identity(Some("ada@x.com"), None));
        assert!(!same_identity(Some("ada@x.com"), Some("bob@x.com")));
    }

    #[tokio::test]
    async fn test_same_assignee_with_whitespace_is_noop() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        fx.engine
            .apply_update(&fx.reviewer, &request.id, assign("a@rakwireless.com"))
            .await
            .unwrap();

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, assign("  a@rakwireless.com  "))
            .await
            .unwrap();
        assert!(outcome.activities.is_empty());
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    #[tokio::test]
    async fn test_stranger_cannot_edit_any_field() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        for patch in [
            status("Done"),
            assign("x@example.com"),
            RequestPatch {
                tags: Some(vec!["x".to_string()]),
                ..RequestPatch::default()
            },
        ] {
            let err = fx
                .engine
                .apply_update(&fx.stranger, &request.id, patch)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::PermissionDenied(_)));
        }
    }

    #[tokio::test]
    async fn test_reviewer_cannot_edit_foreign_content_atomically() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let patch = RequestPatch {
            status: Some("InReview".to_string()),
            company_name: Some("Globex".to_string()),
            ..RequestPatch::default()
        };
        let err = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        let stored = fx.stores.requests.get_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status.as_str(), "Open");
        assert_eq!(stored.company_name, "Acme");
        assert_eq!(activity_types(&fx, &request.id).await, vec![ActivityType::Created]);
    }

    #[tokio::test]
    async fn test_admin_edits_content_of_any_request() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let patch = RequestPatch {
            company_name: Some("Globex".to_string()),
            ..RequestPatch::default()
        };
        let outcome = fx
            .engine
            .apply_update(&fx.admin, &request.id, patch)
            .await
            .unwrap();
        assert_eq!(outcome.request.company_name, "Globex");
        assert!(outcome.activities.is_empty());
    }

    #[tokio::test]
    async fn test_empty_patch_is_invalid() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let err = fx
            .engine
            .apply_update(&fx.owner, &request.id, RequestPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_missing_request_is_not_found() {
        let fx = Fixture::new().await;
        let id = RequestId::parse("REQMISSING").unwrap();
        let err = fx
            .engine
            .apply_update(&fx.admin, &id, status("Done"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(missing) if missing == id));
    }

    // =========================================================================
    // Store failures
    // =========================================================================

    #[tokio::test]
    async fn test_audit_failure_keeps_update() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        fx.memory.fail_activity_appends(true);

        let outcome = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, status("InReview"))
            .await
            .unwrap();

        assert!(outcome.activities.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        let stored = fx.stores.requests.get_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status.as_str(), "InReview");
    }

    #[tokio::test]
    async fn test_request_write_failure_is_fatal() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        fx.memory.fail_request_writes(true);

        let err = fx
            .engine
            .apply_update(&fx.reviewer, &request.id, status("InReview"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::StoreUnavailable(_)));
        assert_eq!(activity_types(&fx, &request.id).await, vec![ActivityType::Created]);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[tokio::test]
    async fn test_get_request_visibility() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let view = fx.engine.get_request(&fx.reviewer, &request.id).await.unwrap();
        assert_eq!(view.creator_email, Some(fx.owner.email.clone()));

        let err = fx
            .engine
            .get_request(&fx.stranger, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        let err = fx
            .engine
            .get_request(&fx.stranger, &RequestId::parse("REQNOPE").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_scopes_by_role() {
        let fx = Fixture::new().await;
        created(&fx).await;
        fx.engine
            .create_request(&fx.stranger, new_request("Initech"))
            .await
            .unwrap();

        let own = fx.engine.list_requests(&fx.owner).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].creator_email, Some(fx.owner.email.clone()));

        let all = fx.engine.list_requests(&fx.reviewer).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].request.created_at >= all[1].request.created_at);
    }

    #[tokio::test]
    async fn test_list_activities_newest_first_with_authors() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        fx.engine
            .apply_update(&fx.reviewer, &request.id, status("InReview"))
            .await
            .unwrap();

        let views = fx
            .engine
            .list_activities(&fx.owner, &request.id)
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].activity.activity_type, ActivityType::StatusChanged);
        assert_eq!(views[0].author_name, "Rae Reviewer");
        assert_eq!(views[1].author_email, fx.owner.email.as_str());

        let err = fx
            .engine
            .list_activities(&fx.stranger, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    #[tokio::test]
    async fn test_delete_permissions() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;

        let err = fx
            .engine
            .delete_request(&fx.stranger, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        let err = fx
            .engine
            .delete_request(&fx.reviewer, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        assert_eq!(fx.admin.role, Role::Admin);
        fx.engine.delete_request(&fx.admin, &request.id).await.unwrap();
        assert!(fx.stores.requests.get_by_id(&request.id).await.unwrap().is_none());

        // Activities stay behind for audit.
        assert_eq!(activity_types(&fx, &request.id).await, vec![ActivityType::Created]);
    }

    #[tokio::test]
    async fn test_batch_delete_empty_is_invalid() {
        let fx = Fixture::new().await;
        let err = fx
            .engine
            .batch_delete_requests(&fx.owner, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_batch_delete_reports_first_missing() {
        let fx = Fixture::new().await;
        let request = created(&fx).await;
        let missing = RequestId::parse("REQGONE").unwrap();

        let err = fx
            .engine
            .batch_delete_requests(&fx.owner, vec![request.id.clone(), missing.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(id) if id == missing));
        assert!(fx.stores.requests.get_by_id(&request.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_delete_is_all_or_nothing() {
        let fx = Fixture::new().await;
        let mine = created(&fx).await;
        let theirs = fx
            .engine
            .create_request(&fx.stranger, new_request("Initech"))
            .await
            .unwrap()
            .request;

        let err = fx
            .engine
            .batch_delete_requests(&fx.owner, vec![mine.id.clone(), theirs.id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
        assert!(fx.stores.requests.get_by_id(&mine.id).await.unwrap().is_some());

        let outcome = fx
            .engine
            .batch_delete_requests(&fx.admin, vec![mine.id.clone(), theirs.id, mine.id])
            .await
            .unwrap();
        assert_eq!(outcome, BatchDeleteOutcome { requested: 3, deleted: 2 });
    }

    // =========================================================================
    // Descriptions
    // =========================================================================

    #[test]
    fn test_unassigned_description_without_target() {
        let id = RequestId::parse("REQ1").unwrap();
        assert_eq!(
            describe_unassigned("Rae", &id, None),
            "Rae unassigned this request"
        );
        assert_eq!(
            describe_unassigned("Rae", &id, Some("Ada")),
            "Rae unassigned request REQ1 from Ada"
        );
    }
}

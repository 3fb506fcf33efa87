//! Request domain types and the update vocabulary.

use chrono::{DateTime, Utc};
use serde_json::Value;

use preconfig_core::{Email, RequestField, RequestId, UserId, WorkflowStatus};

/// Literal that clears the assignee, compared case-insensitively.
pub const UNASSIGN_LITERAL: &str = "unassign";

/// A configuration-change request (domain type).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Immutable identifier.
    pub id: RequestId,
    /// Creator. Set once at creation.
    pub owner_id: UserId,
    /// Customer company the change is for.
    pub company_name: String,
    /// External reference id.
    pub rak_id: String,
    /// Workflow status.
    pub status: WorkflowStatus,
    /// Current assignee identity. `None` means unassigned; never blank.
    pub assignee: Option<String>,
    /// Configuration payload.
    pub config_data: Value,
    /// Change-set payload.
    pub changes: Value,
    /// Configuration before the change.
    pub original_config: Value,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Whether `user` created this request.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Apply a field update in place.
    ///
    /// Stores that cannot express the update natively (the in-memory store)
    /// use this to stay consistent with the SQL adapter.
    pub fn apply(&mut self, update: &RequestUpdate) {
        for value in &update.set {
            match value {
                FieldValue::Status(status) => self.status = status.clone(),
                FieldValue::Assignee(assignee) => self.assignee = Some(assignee.clone()),
                FieldValue::CompanyName(name) => self.company_name.clone_from(name),
                FieldValue::RakId(rak_id) => self.rak_id.clone_from(rak_id),
                FieldValue::ConfigData(data) => self.config_data = data.clone(),
                FieldValue::Changes(changes) => self.changes = changes.clone(),
                FieldValue::OriginalConfig(config) => self.original_config = config.clone(),
                FieldValue::Tags(tags) => self.tags.clone_from(tags),
            }
        }
        for field in &update.remove {
            match field {
                RemovableField::Assignee => self.assignee = None,
            }
        }
    }
}

/// A request together with its creator's email, as returned to readers.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub request: Request,
    pub creator_email: Option<Email>,
}

/// Caller-supplied content for a new request.
#[derive(Debug, Clone, Default)]
pub struct NewRequest {
    pub company_name: String,
    pub rak_id: String,
    pub config_data: Value,
    pub changes: Value,
    pub original_config: Value,
    pub tags: Vec<String>,
}

/// Proposed change to the assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeChange {
    /// Assign to this (trimmed, non-empty) identity.
    Set(String),
    /// Remove the assignee entirely.
    Clear,
}

impl AssigneeChange {
    /// Interpret raw caller input.
    ///
    /// Empty, whitespace-only and the literal `unassign` (any case) all
    /// clear the field. Anything else is trimmed and assigned.
    ///
    /// ```
    /// use preconfig_api::models::AssigneeChange;
    ///
    /// assert_eq!(AssigneeChange::from_input("  "), AssigneeChange::Clear);
    /// assert_eq!(AssigneeChange::from_input("UnAssign"), AssigneeChange::Clear);
    /// assert_eq!(
    ///     AssigneeChange::from_input(" ops@rakwireless.com "),
    ///     AssigneeChange::Set("ops@rakwireless.com".to_string())
    /// );
    /// ```
    #[must_use]
    pub fn from_input(raw: &str) -> Self {
        normalize_assignee(Some(raw)).map_or(Self::Clear, Self::Set)
    }

    /// The assignee value after the change (`None` when cleared).
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Set(identity) => Some(identity),
            Self::Clear => None,
        }
    }
}

/// Fold an assignee value into its canonical form.
///
/// Used on both sides of the assignee diff so that legacy stored values
/// compare the same way as fresh input.
#[must_use]
pub fn normalize_assignee(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNASSIGN_LITERAL) {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Proposed changes to an existing request. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct RequestPatch {
    pub status: Option<String>,
    pub assignee: Option<AssigneeChange>,
    pub company_name: Option<String>,
    pub rak_id: Option<String>,
    pub config_data: Option<Value>,
    pub changes: Option<Value>,
    pub original_config: Option<Value>,
    pub tags: Option<Vec<String>>,
}

impl RequestPatch {
    /// The fields this patch proposes to change, in wire order.
    #[must_use]
    pub fn fields(&self) -> Vec<RequestField> {
        [
            (self.status.is_some(), RequestField::Status),
            (self.assignee.is_some(), RequestField::Assignee),
            (self.company_name.is_some(), RequestField::CompanyName),
            (self.rak_id.is_some(), RequestField::RakId),
            (self.config_data.is_some(), RequestField::ConfigData),
            (self.changes.is_some(), RequestField::Changes),
            (self.original_config.is_some(), RequestField::OriginalConfig),
            (self.tags.is_some(), RequestField::Tags),
        ]
        .into_iter()
        .filter_map(|(present, field)| present.then_some(field))
        .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

/// A single field assignment understood by the request store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Status(WorkflowStatus),
    Assignee(String),
    CompanyName(String),
    RakId(String),
    ConfigData(Value),
    Changes(Value),
    OriginalConfig(Value),
    Tags(Vec<String>),
}

/// Fields that may be unset rather than assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovableField {
    Assignee,
}

/// One store-level update: assignments plus removals, applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestUpdate {
    pub set: Vec<FieldValue>,
    pub remove: Vec<RemovableField>,
}

impl RequestUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Request {
        Request {
            id: RequestId::parse("REQ1").unwrap(),
            owner_id: UserId::new(1),
            company_name: "Acme".to_string(),
            rak_id: "RAK-1".to_string(),
            status: WorkflowStatus::initial(),
            assignee: Some("ops@rakwireless.com".to_string()),
            config_data: json!({}),
            changes: json!({}),
            original_config: json!({}),
            tags: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_assignee_clear_inputs() {
        for raw in ["", "   ", "unassign", "Unassign", " UNASSIGN "] {
            assert_eq!(AssigneeChange::from_input(raw), AssigneeChange::Clear, "{raw:?}");
        }
    }

    #[test]
    fn test_assignee_set_is_trimmed() {
        assert_eq!(
            AssigneeChange::from_input("  jane@example.com\t"),
            AssigneeChange::Set("jane@example.com".to_string())
        );
    }

    #[test]
    fn test_patch_fields() {
        let patch = RequestPatch {
            status: Some("InReview".to_string()),
            tags: Some(vec!["urgent".to_string()]),
            ..RequestPatch::default()
        };
        assert_eq!(patch.fields(), vec![RequestField::Status, RequestField::Tags]);
        assert!(RequestPatch::default().is_empty());
    }

    #[test]
    fn test_apply_removes_assignee() {
        let mut request = sample();
        request.apply(&RequestUpdate {
            set: vec![FieldValue::CompanyName("Globex".to_string())],
            remove: vec![RemovableField::Assignee],
        });
        assert_eq!(request.company_name, "Globex");
        assert_eq!(request.assignee, None);
    }
}

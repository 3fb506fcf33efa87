//! Permission matrix for requests.
//!
//! Role authority ([`Role`] predicates) and ownership are evaluated
//! independently. View and delete combine them with OR. Status changes are
//! gated by role alone: a reviewer may move any request through the
//! workflow, while an owner without workflow authority may not move their
//! own. Content fields belong to the owner (and admins).
//!
//! | Action | Allowed when |
//! |---|---|
//! | view | `can_view_all` or owner |
//! | edit `status` | `can_edit_workflow_status` |
//! | edit `assignee` | owner, admin, or `can_edit_workflow_status` |
//! | edit any other field | owner or admin |
//! | delete | `can_delete_any` or owner |
//! | list all | `can_view_all` (otherwise own requests only) |

use crate::types::{RequestField, Role};

/// A caller's standing towards one specific request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAccess {
    role: Role,
    is_owner: bool,
}

impl RequestAccess {
    /// Describe a caller with `role` who does or does not own the request.
    #[must_use]
    pub const fn new(role: Role, is_owner: bool) -> Self {
        Self { role, is_owner }
    }

    #[must_use]
    pub const fn can_view(&self) -> bool {
        self.role.can_view_all() || self.is_owner
    }

    #[must_use]
    pub const fn can_delete(&self) -> bool {
        self.role.can_delete_any() || self.is_owner
    }

    /// Status authority ignores ownership entirely.
    #[must_use]
    pub const fn can_edit_status(&self) -> bool {
        self.role.can_edit_workflow_status()
    }

    #[must_use]
    pub const fn can_edit_assignee(&self) -> bool {
        self.can_edit_content() || self.role.can_edit_workflow_status()
    }

    #[must_use]
    pub const fn can_edit_content(&self) -> bool {
        self.is_owner || matches!(self.role, Role::Admin)
    }

    /// Whether the caller may change `field`.
    #[must_use]
    pub const fn can_edit(&self, field: RequestField) -> bool {
        match field {
            RequestField::Status => self.can_edit_status(),
            RequestField::Assignee => self.can_edit_assignee(),
            RequestField::CompanyName
            | RequestField::RakId
            | RequestField::ConfigData
            | RequestField::Changes
            | RequestField::OriginalConfig
            | RequestField::Tags => self.can_edit_content(),
        }
    }

    /// The first field in `fields` the caller may not change, if any.
    pub fn first_denied<I>(&self, fields: I) -> Option<RequestField>
    where
        I: IntoIterator<Item = RequestField>,
    {
        fields.into_iter().find(|field| !self.can_edit(*field))
    }
}

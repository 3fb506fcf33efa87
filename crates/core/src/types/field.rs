//! Mutable fields of a request.

use serde::{Deserialize, Serialize};

/// A request field a caller can propose to change.
///
/// The owner and the creation timestamp are absent: they are fixed at
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestField {
    Status,
    Assignee,
    CompanyName,
    RakId,
    ConfigData,
    Changes,
    OriginalConfig,
    Tags,
}

impl RequestField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::CompanyName => "companyName",
            Self::RakId => "rakId",
            Self::ConfigData => "configData",
            Self::Changes => "changes",
            Self::OriginalConfig => "originalConfig",
            Self::Tags => "tags",
        }
    }

    /// Whether the field is request content (owned by the submitter)
    /// rather than workflow state.
    #[must_use]
    pub const fn is_content(self) -> bool {
        !matches!(self, Self::Status | Self::Assignee)
    }
}

impl std::fmt::Display for RequestField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Workflow status of a request.
//!
//! Statuses form an open vocabulary: reviewers may move a request to any
//! non-blank value. Only the initial value is fixed.

use serde::{Deserialize, Serialize};

/// A request's workflow status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowStatus(String);

impl WorkflowStatus {
    /// Status every request starts in.
    pub const INITIAL: &'static str = "Open";

    /// The initial status.
    #[must_use]
    pub fn initial() -> Self {
        Self(Self::INITIAL.to_owned())
    }

    /// Parse a proposed status, trimming surrounding whitespace.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        (!s.is_empty()).then(|| Self(s.to_owned()))
    }

    /// Wrap a value read from storage without validation.
    #[must_use]
    pub const fn from_stored(s: String) -> Self {
        Self(s)
    }

    /// The status as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_is_open() {
        assert_eq!(WorkflowStatus::initial().as_str(), "Open");
        assert_eq!(WorkflowStatus::default(), WorkflowStatus::initial());
    }

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(
            WorkflowStatus::parse(" InReview ").map(|s| s.as_str().to_owned()),
            Some("InReview".to_owned())
        );
        assert_eq!(WorkflowStatus::parse("   "), None);
    }
}

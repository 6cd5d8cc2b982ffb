//! Issue tracker boundary.
//!
//! Components depend on the [`IssueTracker`] trait; [`linear::LinearClient`]
//! is the production implementation. No call is retried: a transient failure
//! surfaces straight to the caller.

pub mod graphql;
pub mod linear;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::errors::TrackerError;
use crate::issue_ref::IssueRef;

pub use linear::{DEFAULT_LINEAR_ENDPOINT, LinearClient};

/// Snapshot of an issue as fetched from the tracker. Owned by the worker
/// that fetched it and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    /// Opaque tracker ID, used for mutations.
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Branch name suggested by the tracker; may be empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub branch_name: String,
    pub url: String,
}

/// Optional filters for listing issues. Empty filters match everything the
/// API key can see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub team: Option<String>,
    pub project: Option<String>,
    pub label: Option<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch the issue's current details.
    async fn fetch_issue(&self, issue: &IssueRef) -> Result<IssueDetails, TrackerError>;

    /// Move the issue to the workspace's "In Progress" state.
    async fn mark_in_progress(&self, issue: &IssueDetails) -> Result<(), TrackerError>;

    /// Post a markdown comment on the issue.
    async fn post_comment(&self, issue: &IssueDetails, body: &str) -> Result<(), TrackerError>;
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_details_null_fields_become_empty() {
        let json = r#"{
            "id": "uuid-1",
            "title": "Fix login",
            "description": null,
            "branchName": null,
            "url": "https://linear.app/acme/issue/ENG-1"
        }"#;
        let issue: IssueDetails = serde_json::from_str(json).unwrap();
        assert_eq!(issue.description, "");
        assert_eq!(issue.branch_name, "");
        assert_eq!(issue.title, "Fix login");
    }

    #[test]
    fn test_issue_details_missing_optional_fields() {
        let json = r#"{"id": "u", "title": "t", "url": "https://x"}"#;
        let issue: IssueDetails = serde_json::from_str(json).unwrap();
        assert!(issue.description.is_empty());
        assert!(issue.branch_name.is_empty());
    }
}

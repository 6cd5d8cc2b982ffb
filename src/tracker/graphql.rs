//! Request and response shapes for the Linear GraphQL API.
//!
//! One variables struct and one data struct per operation, so a field the
//! API renames shows up as a decode error instead of a silently empty value.

use serde::{Deserialize, Serialize};

use super::{IssueDetails, IssueFilter};

pub const ISSUE_BY_NUMBER_QUERY: &str = r#"
query GetIssue($teamKey: String!, $number: Float!) {
  issues(filter: { team: { key: { eq: $teamKey } }, number: { eq: $number } }, first: 1) {
    nodes { id title description branchName url }
  }
}"#;

pub const WORKFLOW_STATES_QUERY: &str = r#"
query GetWorkflowStates {
  workflowStates {
    nodes { id name type }
  }
}"#;

pub const ISSUE_UPDATE_MUTATION: &str = r#"
mutation UpdateIssue($id: String!, $stateId: String!) {
  issueUpdate(id: $id, input: { stateId: $stateId }) {
    success
  }
}"#;

pub const COMMENT_CREATE_MUTATION: &str = r#"
mutation CreateComment($issueId: String!, $body: String!) {
  commentCreate(input: { issueId: $issueId, body: $body }) {
    success
  }
}"#;

pub const TEAMS_QUERY: &str = r#"
query GetTeams {
  teams {
    nodes {
      id key name
      projects { nodes { id name } }
    }
  }
}"#;

/// Build the issue listing query. Only the filters that are set appear in the
/// query text, so unset variables are never referenced.
pub fn issues_by_filter_query(filter: &IssueFilter) -> String {
    let mut clauses = Vec::new();
    if filter.team.is_some() {
        clauses.push("team: { key: { eq: $teamKey } }");
    }
    if filter.project.is_some() {
        clauses.push("project: { name: { eq: $projectName } }");
    }
    if filter.label.is_some() {
        clauses.push("labels: { name: { eq: $label } }");
    }
    let filter_arg = if clauses.is_empty() {
        String::new()
    } else {
        format!("filter: {{ {} }}, ", clauses.join(", "))
    };
    format!(
        "query GetIssues($teamKey: String, $projectName: String, $label: String) {{\n  \
         issues({}first: 50, orderBy: createdAt) {{\n    \
         nodes {{ id title description branchName url }}\n  }}\n}}",
        filter_arg
    )
}

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<D> {
    pub data: Option<D>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub nodes: Vec<T>,
}

/// Variables for operations that take none.
#[derive(Debug, Default, Serialize)]
pub struct NoVariables {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueByNumberVariables<'a> {
    pub team_key: &'a str,
    /// The API types issue numbers as Float.
    pub number: f64,
}

#[derive(Debug, Deserialize)]
pub struct IssuesData {
    pub issues: Connection<IssueDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatesData {
    pub workflow_states: Connection<WorkflowState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateVariables<'a> {
    pub id: &'a str,
    pub state_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateData {
    pub issue_update: MutationResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateVariables<'a> {
    pub issue_id: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateData {
    pub comment_create: MutationResult,
}

#[derive(Debug, Deserialize)]
pub struct MutationResult {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct TeamsData {
    pub teams: Connection<Team>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
    pub key: String,
    pub name: String,
    pub projects: Connection<Project>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuesByFilterVariables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
}

impl<'a> From<&'a IssueFilter> for IssuesByFilterVariables<'a> {
    fn from(filter: &'a IssueFilter) -> Self {
        Self {
            team_key: filter.team.as_deref(),
            project_name: filter.project.as_deref(),
            label: filter.label.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_by_number_variables_shape() {
        let vars = IssueByNumberVariables {
            team_key: "DEL",
            number: 163.0,
        };
        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["teamKey"], "DEL");
        assert_eq!(json["number"], 163.0);
    }

    #[test]
    fn test_no_variables_serializes_to_empty_object() {
        let req = GraphQlRequest {
            query: TEAMS_QUERY,
            variables: NoVariables::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["variables"], serde_json::json!({}));
    }

    #[test]
    fn test_filter_query_without_filters() {
        let q = issues_by_filter_query(&IssueFilter::default());
        assert!(!q.contains("filter:"));
        assert!(q.contains("first: 50"));
    }

    #[test]
    fn test_filter_query_with_team_and_label() {
        let filter = IssueFilter {
            team: Some("ENG".into()),
            project: None,
            label: Some("bug".into()),
        };
        let q = issues_by_filter_query(&filter);
        assert!(q.contains("filter: { team: { key: { eq: $teamKey } }, labels: { name: { eq: $label } } }"));
        assert!(!q.contains("project:"));

        let vars = serde_json::to_value(IssuesByFilterVariables::from(&filter)).unwrap();
        assert_eq!(vars, serde_json::json!({"teamKey": "ENG", "label": "bug"}));
    }

    #[test]
    fn test_teams_response_nests_projects() {
        let data: TeamsData = serde_json::from_value(serde_json::json!({
            "teams": {"nodes": [{
                "id": "t1",
                "key": "DEL",
                "name": "Delivery",
                "projects": {"nodes": [{"id": "p1", "name": "Billing"}]}
            }]}
        }))
        .unwrap();
        let team = data.teams.nodes[0].clone();
        assert_eq!(team.key, "DEL");
        assert_eq!(team.projects.nodes[0].name, "Billing");
    }

    #[test]
    fn test_workflow_state_type_field() {
        let json = r#"{"workflowStates":{"nodes":[{"id":"s1","name":"In Progress","type":"started"}]}}"#;
        let data: WorkflowStatesData = serde_json::from_str(json).unwrap();
        assert_eq!(data.workflow_states.nodes[0].state_type, "started");
    }

    #[test]
    fn test_response_errors_default_to_empty() {
        let json = r#"{"data":{"issueUpdate":{"success":true}}}"#;
        let resp: GraphQlResponse<IssueUpdateData> = serde_json::from_str(json).unwrap();
        assert!(resp.errors.is_empty());
        assert!(resp.data.unwrap().issue_update.success);
    }
}

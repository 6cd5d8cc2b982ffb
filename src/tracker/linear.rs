//! Linear GraphQL client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::graphql::{
    COMMENT_CREATE_MUTATION, CommentCreateData, CommentCreateVariables, GraphQlRequest,
    GraphQlResponse, ISSUE_BY_NUMBER_QUERY, ISSUE_UPDATE_MUTATION, IssueByNumberVariables,
    IssueUpdateData, IssueUpdateVariables, IssuesByFilterVariables, IssuesData, NoVariables,
    TEAMS_QUERY, Team, TeamsData, WORKFLOW_STATES_QUERY, WorkflowStatesData,
    issues_by_filter_query,
};
use super::{IssueDetails, IssueFilter, IssueTracker};
use crate::errors::TrackerError;
use crate::issue_ref::IssueRef;

pub const DEFAULT_LINEAR_ENDPOINT: &str = "https://api.linear.app/graphql";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const IN_PROGRESS_STATE: &str = "In Progress";
const IN_PROGRESS_STATE_TYPE: &str = "started";

/// Authenticated client for the Linear API.
#[derive(Debug, Clone)]
pub struct LinearClient {
    api_key: String,
    endpoint: String,
    http: reqwest::Client,
}

impl LinearClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Request(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_LINEAR_ENDPOINT.to_string(),
            http,
        })
    }

    /// Point the client at a different GraphQL endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// All teams visible to the API key, with their projects.
    pub async fn fetch_teams(&self) -> Result<Vec<Team>, TrackerError> {
        let data: TeamsData = self.execute(TEAMS_QUERY, NoVariables::default()).await?;
        Ok(data.teams.nodes)
    }

    /// Up to 50 issues matching `filter`, oldest first.
    pub async fn fetch_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueDetails>, TrackerError> {
        let query = issues_by_filter_query(filter);
        let data: IssuesData = self
            .execute(&query, IssuesByFilterVariables::from(filter))
            .await?;
        Ok(data.issues.nodes)
    }

    async fn in_progress_state_id(&self) -> Result<String, TrackerError> {
        let data: WorkflowStatesData = self
            .execute(WORKFLOW_STATES_QUERY, NoVariables::default())
            .await?;
        data.workflow_states
            .nodes
            .into_iter()
            .find(|s| s.name == IN_PROGRESS_STATE && s.state_type == IN_PROGRESS_STATE_TYPE)
            .map(|s| s.id)
            .ok_or_else(|| TrackerError::StateNotFound(IN_PROGRESS_STATE.to_string()))
    }

    /// POST one GraphQL operation and decode its `data`. Non-200 statuses and
    /// GraphQL `errors` are reported as [`TrackerError::Request`].
    async fn execute<V, D>(&self, query: &str, variables: V) -> Result<D, TrackerError>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let request = GraphQlRequest { query, variables };
        let resp = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            // Linear takes the raw key, not a Bearer token.
            .header(AUTHORIZATION, self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| TrackerError::Request(format!("failed to execute HTTP request: {}", e)))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(TrackerError::Request(format!(
                "Linear API returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GraphQlResponse<D> = resp
            .json()
            .await
            .map_err(|e| TrackerError::Request(format!("failed to decode GraphQL response: {}", e)))?;
        if let Some(err) = parsed.errors.first() {
            return Err(TrackerError::Request(format!("GraphQL error: {}", err.message)));
        }
        parsed
            .data
            .ok_or_else(|| TrackerError::Request("GraphQL response contained no data".to_string()))
    }
}

#[async_trait]
impl IssueTracker for LinearClient {
    async fn fetch_issue(&self, issue: &IssueRef) -> Result<IssueDetails, TrackerError> {
        debug!(issue = %issue, "fetching issue details");
        let vars = IssueByNumberVariables {
            team_key: issue.team(),
            number: issue.number() as f64,
        };
        let data: IssuesData = self
            .execute(ISSUE_BY_NUMBER_QUERY, vars)
            .await
            .map_err(|e| TrackerError::TrackerFetchFailed {
                issue_id: issue.to_string(),
                message: e.to_string(),
            })?;
        data.issues
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::IssueNotFound(issue.to_string()))
    }

    async fn mark_in_progress(&self, issue: &IssueDetails) -> Result<(), TrackerError> {
        let update_failed = |message: String| TrackerError::TrackerUpdateFailed {
            issue_id: issue.id.clone(),
            message,
        };
        let state_id = match self.in_progress_state_id().await {
            Ok(id) => id,
            Err(e @ TrackerError::StateNotFound(_)) => return Err(e),
            Err(e) => return Err(update_failed(e.to_string())),
        };

        let vars = IssueUpdateVariables {
            id: &issue.id,
            state_id: &state_id,
        };
        let data: IssueUpdateData = self
            .execute(ISSUE_UPDATE_MUTATION, vars)
            .await
            .map_err(|e| update_failed(e.to_string()))?;
        if !data.issue_update.success {
            return Err(update_failed("issue update reported failure".to_string()));
        }
        Ok(())
    }

    async fn post_comment(&self, issue: &IssueDetails, body: &str) -> Result<(), TrackerError> {
        let vars = CommentCreateVariables {
            issue_id: &issue.id,
            body,
        };
        let update_failed = |message: String| TrackerError::TrackerUpdateFailed {
            issue_id: issue.id.clone(),
            message,
        };
        let data: CommentCreateData = self
            .execute(COMMENT_CREATE_MUTATION, vars)
            .await
            .map_err(|e| update_failed(e.to_string()))?;
        if !data.comment_create.success {
            return Err(update_failed("comment creation reported failure".to_string()));
        }
        Ok(())
    }
}

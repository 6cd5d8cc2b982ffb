//! Single-issue flow: clone the repository, let the agent implement the
//! issue on a fresh branch, push it and open a pull request.
//!
//! Used by the `workflow` subcommand and by the HTTP trigger.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::agent::{AgentRunner, build_prompt};
use crate::errors::WorkflowError;
use crate::gitops::{combined_output, run_git, sanitize_branch_name};
use crate::issue_ref::IssueRef;
use crate::tracker::{IssueDetails, IssueFilter, IssueTracker, LinearClient};

/// Opens a pull request for the branch checked out in `workdir` and returns
/// its URL.
#[async_trait]
pub trait PullRequestOpener: Send + Sync {
    async fn open(&self, workdir: &Path, title: &str, body: &str) -> Result<String, WorkflowError>;
}

/// `gh pr create`, authenticated through `GITHUB_TOKEN` when one is given.
#[derive(Debug, Clone, Default)]
pub struct GhCli {
    token: Option<String>,
}

impl GhCli {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl PullRequestOpener for GhCli {
    async fn open(&self, workdir: &Path, title: &str, body: &str) -> Result<String, WorkflowError> {
        let mut cmd = Command::new("gh");
        cmd.args(["pr", "create", "--title", title, "--body", body])
            .current_dir(workdir)
            .stdin(std::process::Stdio::null());
        if let Some(token) = &self.token {
            cmd.env("GITHUB_TOKEN", token);
        }
        let output = cmd.output().await.map_err(|source| WorkflowError::Spawn {
            program: "gh".to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(WorkflowError::PullRequestFailed {
                output: combined_output(&output),
            });
        }
        // gh prints the new pull request's URL as the last stdout line.
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().last().unwrap_or_default().trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub repo_url: String,
    /// Parent directory for the clone.
    pub workdir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub issue_id: String,
    pub title: String,
    pub branch: String,
    pub clone_path: PathBuf,
    pub pr_url: String,
}

pub struct IssueWorkflow {
    tracker: Arc<dyn IssueTracker>,
    agent: Arc<dyn AgentRunner>,
    pull_requests: Arc<dyn PullRequestOpener>,
    options: WorkflowOptions,
}

impl IssueWorkflow {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        agent: Arc<dyn AgentRunner>,
        pull_requests: Arc<dyn PullRequestOpener>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            tracker,
            agent,
            pull_requests,
            options,
        }
    }

    pub async fn run(&self, issue_ref: &IssueRef) -> Result<WorkflowReport, WorkflowError> {
        let issue_id = issue_ref.to_string();
        info!(issue = %issue_id, repo_url = %self.options.repo_url, "Starting workflow");

        let issue = self.tracker.fetch_issue(issue_ref).await?;
        info!(issue = %issue_id, branch_name = %issue.branch_name, "Issue: {}", issue.title);

        if let Err(e) = self.tracker.mark_in_progress(&issue).await {
            warn!(issue = %issue_id, "Failed to mark issue as In Progress: {}", e);
        }

        let clone_name = format!(
            "{}-{}",
            repo_name(&self.options.repo_url),
            sanitize_branch_name(&issue_id)
        );
        let clone_path = self.clone_repository(&clone_name).await?;

        let branch = feature_branch_name(&issue, &issue_id);
        info!(issue = %issue_id, "Creating branch {}", branch);
        git(&clone_path, "checkout", ["checkout", "-b", branch.as_str()]).await?;

        let outcome = self.agent.execute(&build_prompt(&issue), &clone_path).await?;
        if !outcome.changed {
            return Err(WorkflowError::NoChanges);
        }

        info!(issue = %issue_id, "Committing and pushing changes");
        git(&clone_path, "add", ["add", "."]).await?;
        let message = commit_message(&issue);
        git(&clone_path, "commit", ["commit", "-m", message.as_str()]).await?;
        git(
            &clone_path,
            "push",
            ["push", "--set-upstream", "origin", branch.as_str()],
        )
        .await?;

        let (title, body) = pull_request_text(&issue);
        let pr_url = self.pull_requests.open(&clone_path, &title, &body).await?;
        info!(issue = %issue_id, "Opened pull request {}", pr_url);

        if !pr_url.is_empty()
            && let Err(e) = self
                .tracker
                .post_comment(&issue, &format!("Pull request opened: {}", pr_url))
                .await
        {
            warn!(issue = %issue_id, "Failed to post pull request comment: {}", e);
        }

        Ok(WorkflowReport {
            issue_id,
            title: issue.title,
            branch,
            clone_path,
            pr_url,
        })
    }

    /// Clone into a freshly claimed directory under the workdir and return
    /// its path. A failed clone leaves nothing behind.
    async fn clone_repository(&self, clone_name: &str) -> Result<PathBuf, WorkflowError> {
        let url = &self.options.repo_url;
        let clone_failed = |output: String| WorkflowError::CloneFailed {
            url: url.clone(),
            output,
        };
        let clone_path = claim_directory(&self.options.workdir, clone_name)
            .await
            .map_err(|e| clone_failed(format!("claiming clone directory: {}", e)))?;

        info!("Cloning {} into {}", url, clone_path.display());
        let args = [OsStr::new("clone"), OsStr::new(url), clone_path.as_os_str()];
        let failure = match run_git(&self.options.workdir, args).await {
            Ok(output) if output.status.success() => return Ok(clone_path),
            Ok(output) => combined_output(&output),
            Err(e) => e.to_string(),
        };
        if let Err(e) = tokio::fs::remove_dir_all(&clone_path).await {
            warn!("Failed to remove {}: {}", clone_path.display(), e);
        }
        Err(clone_failed(failure))
    }
}

/// Atomically create `<parent>/<name>`, falling back to `<name>-2`, `<name>-3`
/// and so on while earlier runs still occupy the name.
async fn claim_directory(parent: &Path, name: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(parent).await?;
    let mut attempt = 1u32;
    loop {
        let candidate = if attempt == 1 {
            parent.join(name)
        } else {
            parent.join(format!("{}-{}", name, attempt))
        };
        match tokio::fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Pick the first open issue matching `filter`. With no filters at all, the
/// first team (and its first project) visible to the API key is used.
pub async fn select_issue(
    client: &LinearClient,
    mut filter: IssueFilter,
) -> Result<IssueRef, WorkflowError> {
    if filter == IssueFilter::default() {
        let teams = client.fetch_teams().await?;
        let team = teams.into_iter().next().ok_or(WorkflowError::NoIssues)?;
        info!("Using first available team: {}", team.key);
        if let Some(project) = team.projects.nodes.into_iter().next() {
            info!("Using first available project: {}", project.name);
            filter.project = Some(project.name);
        }
        filter.team = Some(team.key);
    }

    let issue = client
        .fetch_issues(&filter)
        .await?
        .into_iter()
        .next()
        .ok_or(WorkflowError::NoIssues)?;
    let issue_ref = IssueRef::resolve(&issue.url)?;
    info!("Selected issue {}: {}", issue_ref, issue.title);
    Ok(issue_ref)
}

/// The tracker's suggested branch, else `feature/<issue_id>` lowercased with
/// hyphens turned into underscores.
pub fn feature_branch_name(issue: &IssueDetails, issue_id: &str) -> String {
    if !issue.branch_name.trim().is_empty() {
        return issue.branch_name.trim().to_string();
    }
    format!("feature/{}", issue_id.replace('-', "_").to_lowercase())
}

pub fn commit_message(issue: &IssueDetails) -> String {
    format!(
        "feat: {}\n\n{}\n\nLinear Issue: {}",
        issue.title, issue.description, issue.url
    )
}

/// Pull request title and body.
pub fn pull_request_text(issue: &IssueDetails) -> (String, String) {
    (
        format!("feat: {}", issue.title),
        format!("{}\n\nLinear Issue: {}", issue.description, issue.url),
    )
}

/// Last path segment of a repository URL without `.git`.
pub fn repo_name(repo_url: &str) -> &str {
    let trimmed = repo_url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() { "repo" } else { name }
}

async fn git<const N: usize>(
    dir: &Path,
    step: &str,
    args: [&str; N],
) -> Result<(), WorkflowError> {
    let output = run_git(dir, args)
        .await
        .map_err(|source| WorkflowError::Spawn {
            program: "git".to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(WorkflowError::GitFailed {
            step: step.to_string(),
            output: combined_output(&output),
        });
    }
    Ok(())
}

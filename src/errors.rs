//! Typed error hierarchy for monday.
//!
//! One enum per subsystem:
//! - `PrepareError`: shared repository preparation (runs once, aborts the run)
//! - `WorktreeError`: per-issue worktree creation
//! - `CleanupError`: worktree reclamation (runs once, aborts the run)
//! - `TrackerError`: issue tracker boundary
//! - `AgentError`: agent or terminal handoff
//! - `PoolError`: the worker pool itself (never a single issue's failure)
//! - `IssueError`: a per-issue failure tagged with the stage that produced it
//! - `RunError`: aborts a whole multi-issue run
//! - `WorkflowError`: the single-issue pull request flow

use std::path::PathBuf;

use thiserror::Error;

/// Errors from preparing the shared repository before any worker starts.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("not a git repository: {path}")]
    NotARepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("branch {branch} does not exist")]
    BranchNotFound { branch: String },

    #[error("failed to checkout branch {branch}: {output}")]
    CheckoutFailed { branch: String, output: String },

    #[error("failed to pull latest changes: {output}")]
    SyncFailed { output: String },

    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors from creating the isolated worktree for one issue.
#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("not a git repository: {path}")]
    NotARepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("base branch {branch} does not exist")]
    BranchNotFound { branch: String },

    #[error("worktree for issue {issue_id} already exists at {}", path.display())]
    WorktreeAlreadyExists { issue_id: String, path: PathBuf },

    #[error("failed to create worktree root directory {}: {source}", path.display())]
    RootCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create worktree for issue {issue_id}: {output}")]
    WorktreeCreationFailed { issue_id: String, output: String },
}

/// Errors from reclaiming aged worktrees.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cleanup days must be non-negative, got {0}")]
    InvalidThreshold(i64),

    #[error("reading worktree root {}: {source}", path.display())]
    ReadRootFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("removing worktree directory {}: {source}", path.display())]
    RemovalFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git directory not found at {}", path.display())]
    GitDirNotFound { path: PathBuf },

    #[error("git worktree prune failed: {output}")]
    PruneFailed { output: String },
}

/// Errors at the issue tracker boundary. No retries are attempted; every
/// transient failure surfaces immediately.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid issue reference '{input}': expected TEAM-NUMBER (e.g. DEL-163)")]
    InvalidIssueRef { input: String },

    #[error("failed to fetch issue {issue_id}: {message}")]
    TrackerFetchFailed { issue_id: String, message: String },

    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("failed to update issue {issue_id}: {message}")]
    TrackerUpdateFailed { issue_id: String, message: String },

    #[error("workflow state '{0}' not found")]
    StateNotFound(String),

    #[error("tracker request failed: {0}")]
    Request(String),
}

/// Errors from handing a worktree to the agent or terminal.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent invocation failed (exit code {exit_code:?}): {output}")]
    AgentInvocationFailed {
        exit_code: Option<i32>,
        output: String,
    },
}

/// Errors from the worker pool's scheduling machinery. Individual issue
/// failures are counted, never reported here.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("concurrency must be between 1 and {max}, got {0}", max = tokio::sync::Semaphore::MAX_PERMITS)]
    InvalidConcurrency(usize),

    #[error("worker task for issue {issue_id} aborted: {message}")]
    WorkerAborted { issue_id: String, message: String },

    #[error("worker semaphore closed")]
    SemaphoreClosed,
}

/// A single issue's failure, tagged with the stage that produced it.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("[{issue_id}] fetching issue: {source}")]
    Fetch {
        issue_id: String,
        #[source]
        source: TrackerError,
    },

    #[error("[{issue_id}] creating worktree: {source}")]
    Worktree {
        issue_id: String,
        #[source]
        source: WorktreeError,
    },

    #[error("[{issue_id}] writing feature file {}: {source}", path.display())]
    FeatureFile {
        issue_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[{issue_id}] launching: {source}")]
    Handoff {
        issue_id: String,
        #[source]
        source: AgentError,
    },
}

impl IssueError {
    pub fn issue_id(&self) -> &str {
        match self {
            IssueError::Fetch { issue_id, .. }
            | IssueError::Worktree { issue_id, .. }
            | IssueError::FeatureFile { issue_id, .. }
            | IssueError::Handoff { issue_id, .. } => issue_id,
        }
    }
}

/// Failures that abort a whole multi-issue run before or around the pool.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("preparing repository: {0}")]
    Prepare(#[from] PrepareError),

    #[error("cleaning worktrees: {0}")]
    Cleanup(#[from] CleanupError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors from the single-issue clone, agent, pull request flow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("no issues found matching the given filters")]
    NoIssues,

    #[error("failed to clone {url}: {output}")]
    CloneFailed { url: String, output: String },

    #[error("git {step} failed: {output}")]
    GitFailed { step: String, output: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent run failed: {0}")]
    Agent(#[from] AgentError),

    #[error("agent made no changes")]
    NoChanges,

    #[error("failed to create pull request: {output}")]
    PullRequestFailed { output: String },
}

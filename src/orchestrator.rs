//! Multi-issue run: prepare the shared repository, reclaim aged worktrees,
//! then fan the issues out over the worker pool.
//!
//! The order is load-bearing. The base branch must be settled before any
//! worker branches from it, and reclamation must finish before any worker
//! allocates under the worktree root; nothing else serializes them.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{IssueError, RunError};
use crate::gitops::{
    CheckThenCreate, CleanupReport, WorktreeAllocator, clean_worktrees, prepare_repository,
    write_feature_file,
};
use crate::gitops::feature::FEATURE_FILE_NAME;
use crate::issue_ref::IssueRef;
use crate::launcher::Launcher;
use crate::pool::{PoolSummary, process_all};
use crate::tracker::IssueTracker;

/// Settings for one multi-issue run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: PathBuf,
    pub worktree_root: PathBuf,
    pub base_branch: String,
    pub concurrency: usize,
    pub cleanup_days: i64,
    pub dry_run: bool,
    pub skip_cleanup: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// `None` when cleanup was skipped.
    pub cleanup: Option<CleanupReport>,
    pub pool: PoolSummary,
}

pub struct Orchestrator {
    tracker: Arc<dyn IssueTracker>,
    launcher: Arc<dyn Launcher>,
    allocator: Arc<dyn WorktreeAllocator>,
    options: RunOptions,
}

/// Everything a worker needs, shared across the pool.
struct WorkerContext {
    tracker: Arc<dyn IssueTracker>,
    launcher: Arc<dyn Launcher>,
    allocator: Arc<dyn WorktreeAllocator>,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        launcher: Arc<dyn Launcher>,
        options: RunOptions,
    ) -> Self {
        Self {
            tracker,
            launcher,
            allocator: Arc::new(CheckThenCreate),
            options,
        }
    }

    /// Replace the default check-then-create worktree allocation.
    pub fn with_allocator(mut self, allocator: Arc<dyn WorktreeAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every issue to completion. Individual issue failures are counted
    /// in the returned summary; only preparation, cleanup and pool failures
    /// are errors.
    pub async fn run(&self, issues: Vec<IssueRef>) -> Result<RunReport, RunError> {
        let opts = &self.options;

        info!(
            "Preparing repository {} on branch {}",
            opts.repo_path.display(),
            opts.base_branch
        );
        prepare_repository(&opts.repo_path, &opts.base_branch).await?;

        let cleanup = if opts.skip_cleanup {
            info!("Skipping worktree cleanup");
            None
        } else {
            Some(
                clean_worktrees(
                    &opts.worktree_root,
                    &opts.repo_path,
                    opts.cleanup_days,
                    opts.dry_run,
                )
                .await?,
            )
        };

        let ctx = Arc::new(WorkerContext {
            tracker: Arc::clone(&self.tracker),
            launcher: Arc::clone(&self.launcher),
            allocator: Arc::clone(&self.allocator),
            options: opts.clone(),
        });
        let ids = issues.iter().map(IssueRef::to_string).collect();
        let pool = process_all(ids, opts.concurrency, move |issue_id| {
            let ctx = Arc::clone(&ctx);
            async move { process_issue(&ctx, &issue_id).await.map(|_| ()) }
        })
        .await?;

        Ok(RunReport { cleanup, pool })
    }
}

/// One worker's sequence: fetch, mark in progress, allocate the worktree,
/// write the feature file, hand off. Returns the worktree path.
async fn process_issue(ctx: &WorkerContext, issue_id: &str) -> Result<PathBuf, IssueError> {
    let opts = &ctx.options;
    let issue_ref = IssueRef::resolve(issue_id).map_err(|source| IssueError::Fetch {
        issue_id: issue_id.to_string(),
        source,
    })?;

    info!("[{}] Fetching issue details", issue_id);
    let issue = ctx
        .tracker
        .fetch_issue(&issue_ref)
        .await
        .map_err(|source| IssueError::Fetch {
            issue_id: issue_id.to_string(),
            source,
        })?;
    info!("[{}] Title: {}", issue_id, issue.title);

    // The status update is best-effort; the worktree is the deliverable.
    if let Err(e) = ctx.tracker.mark_in_progress(&issue).await {
        warn!("[{}] Failed to mark issue as In Progress: {}", issue_id, e);
    } else {
        info!("[{}] Marked issue as In Progress", issue_id);
    }

    let worktree = ctx
        .allocator
        .create_worktree(
            &opts.worktree_root,
            &opts.repo_path,
            issue_id,
            &opts.base_branch,
        )
        .await
        .map_err(|source| IssueError::Worktree {
            issue_id: issue_id.to_string(),
            source,
        })?;
    info!("[{}] Created worktree at {}", issue_id, worktree.display());

    write_feature_file(&worktree, &issue.title, &issue.description)
        .await
        .map_err(|source| IssueError::FeatureFile {
            issue_id: issue_id.to_string(),
            path: worktree.join(FEATURE_FILE_NAME),
            source,
        })?;

    if opts.dry_run {
        info!(
            "[{}] [dry-run] would launch {} in {}",
            issue_id,
            ctx.launcher.name(),
            worktree.display()
        );
    } else {
        info!("[{}] Launching {}", issue_id, ctx.launcher.name());
        ctx.launcher
            .launch(issue_id, &issue, &worktree)
            .await
            .map_err(|source| IssueError::Handoff {
                issue_id: issue_id.to_string(),
                source,
            })?;
    }

    Ok(worktree)
}

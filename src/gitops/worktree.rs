//! Per-issue worktree creation.
//!
//! The existence check on the target path is the only concurrency control
//! between workers: two workers asking for the same issue cannot both win.
//! [`CheckThenCreate`] keeps the plain stat-then-`git worktree add` sequence
//! (a narrow window exists between the two, and losing it yields a creation
//! error rather than a shared directory). [`AtomicClaim`] closes that window
//! by claiming the directory with a non-recursive `mkdir` first.
//!
//! Both the directory name and the branch name are the sanitized issue
//! identifier, so the two can never disagree.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::repo::{local_branch_exists, open_repository};
use super::sanitize::sanitize_branch_name;
use super::{combined_output, run_git};
use crate::errors::WorktreeError;

/// Strategy for allocating an issue's worktree under a shared root.
#[async_trait]
pub trait WorktreeAllocator: Send + Sync {
    /// Create the worktree for `issue_id` and return its absolute path.
    async fn create_worktree(
        &self,
        worktree_root: &Path,
        repo_path: &Path,
        issue_id: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorktreeError>;
}

/// Stat the target path, then create. Matches the historical behaviour.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckThenCreate;

/// Claim the target directory atomically before handing it to git.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicClaim;

#[async_trait]
impl WorktreeAllocator for CheckThenCreate {
    async fn create_worktree(
        &self,
        worktree_root: &Path,
        repo_path: &Path,
        issue_id: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorktreeError> {
        create_worktree_for_issue(worktree_root, repo_path, issue_id, base_branch).await
    }
}

#[async_trait]
impl WorktreeAllocator for AtomicClaim {
    async fn create_worktree(
        &self,
        worktree_root: &Path,
        repo_path: &Path,
        issue_id: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorktreeError> {
        let target = validate(worktree_root, repo_path, issue_id, base_branch)?;
        ensure_root(worktree_root).await?;

        match tokio::fs::create_dir(&target.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(WorktreeError::WorktreeAlreadyExists {
                    issue_id: issue_id.to_string(),
                    path: target.path,
                });
            }
            Err(source) => {
                return Err(WorktreeError::RootCreationFailed {
                    path: target.path,
                    source,
                });
            }
        }

        // git accepts an empty existing directory as the worktree target.
        let result = add_worktree(repo_path, issue_id, &target, base_branch).await;
        if result.is_err()
            && let Err(e) = tokio::fs::remove_dir(&target.path).await
        {
            warn!(path = %target.path.display(), "failed to release claimed directory: {}", e);
        }
        result.map(|()| target.path)
    }
}

/// Create an isolated worktree for `issue_id` on a new branch cut from
/// `base_branch`.
///
/// Checks run in order and the first failure wins: repository validity,
/// base branch existence, target path non-existence. A collision fails with
/// [`WorktreeError::WorktreeAlreadyExists`] without touching the filesystem.
/// A failed `git worktree add` is not rolled back; a branch may remain
/// registered without a directory.
pub async fn create_worktree_for_issue(
    worktree_root: &Path,
    repo_path: &Path,
    issue_id: &str,
    base_branch: &str,
) -> Result<PathBuf, WorktreeError> {
    debug!(
        issue = issue_id,
        root = %worktree_root.display(),
        repo = %repo_path.display(),
        base_branch,
        "creating worktree"
    );
    let target = validate(worktree_root, repo_path, issue_id, base_branch)?;

    if tokio::fs::symlink_metadata(&target.path).await.is_ok() {
        return Err(WorktreeError::WorktreeAlreadyExists {
            issue_id: issue_id.to_string(),
            path: target.path,
        });
    }

    ensure_root(worktree_root).await?;
    add_worktree(repo_path, issue_id, &target, base_branch).await?;
    Ok(target.path)
}

struct Target {
    path: PathBuf,
    branch: String,
}

fn validate(
    worktree_root: &Path,
    repo_path: &Path,
    issue_id: &str,
    base_branch: &str,
) -> Result<Target, WorktreeError> {
    let repo = open_repository(repo_path).map_err(|source| WorktreeError::NotARepository {
        path: repo_path.to_path_buf(),
        source,
    })?;
    if !local_branch_exists(&repo, base_branch) {
        return Err(WorktreeError::BranchNotFound {
            branch: base_branch.to_string(),
        });
    }

    let branch = sanitize_branch_name(issue_id);
    let root = std::path::absolute(worktree_root).map_err(|source| {
        WorktreeError::RootCreationFailed {
            path: worktree_root.to_path_buf(),
            source,
        }
    })?;
    Ok(Target {
        path: root.join(&branch),
        branch,
    })
}

async fn ensure_root(worktree_root: &Path) -> Result<(), WorktreeError> {
    tokio::fs::create_dir_all(worktree_root)
        .await
        .map_err(|source| WorktreeError::RootCreationFailed {
            path: worktree_root.to_path_buf(),
            source,
        })
}

async fn add_worktree(
    repo_path: &Path,
    issue_id: &str,
    target: &Target,
    base_branch: &str,
) -> Result<(), WorktreeError> {
    let args: [&OsStr; 6] = [
        OsStr::new("worktree"),
        OsStr::new("add"),
        OsStr::new("-b"),
        OsStr::new(&target.branch),
        target.path.as_os_str(),
        OsStr::new(base_branch),
    ];
    let output = run_git(repo_path, args).await.map_err(|e| {
        WorktreeError::WorktreeCreationFailed {
            issue_id: issue_id.to_string(),
            output: format!("failed to run git: {}", e),
        }
    })?;
    if !output.status.success() {
        return Err(WorktreeError::WorktreeCreationFailed {
            issue_id: issue_id.to_string(),
            output: combined_output(&output),
        });
    }
    debug!(issue = issue_id, branch = %target.branch, path = %target.path.display(), "worktree created");
    Ok(())
}

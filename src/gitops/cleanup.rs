//! Time-based reclamation of worktree directories.
//!
//! Reclamation looks only at directory age, never at whether the work inside
//! is finished. It is not coordinated with worktree creation: callers must
//! let it finish before any worker starts allocating under the same root.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use tracing::{info, warn};

use super::{combined_output, run_git};
use crate::errors::CleanupError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a cleanup pass removed (or would have removed, in dry-run mode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub reclaimed: Vec<PathBuf>,
    pub dry_run: bool,
    pub pruned: bool,
}

/// Remove worktree directories under `worktree_root` last modified more than
/// `threshold_days` ago, then run `git worktree prune` in `repo_path`.
///
/// Only directories are candidates; plain files are never touched. A missing
/// root means there is nothing to clean. In dry-run mode decisions are logged
/// and neither the directories nor the git metadata are modified. A removal
/// failure aborts the pass without restoring directories already removed.
pub async fn clean_worktrees(
    worktree_root: &Path,
    repo_path: &Path,
    threshold_days: i64,
    dry_run: bool,
) -> Result<CleanupReport, CleanupError> {
    if threshold_days < 0 {
        return Err(CleanupError::InvalidThreshold(threshold_days));
    }

    let mut report = CleanupReport {
        dry_run,
        ..Default::default()
    };

    match tokio::fs::metadata(worktree_root).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Worktree root {} does not exist, nothing to clean",
                worktree_root.display()
            );
            return Ok(report);
        }
        _ => {}
    }

    // A threshold reaching past the representable calendar makes nothing old enough.
    let Some(cutoff) =
        Duration::try_days(threshold_days).and_then(|age| Local::now().checked_sub_signed(age))
    else {
        info!(
            "Cleanup threshold of {} days predates any timestamp, nothing to clean",
            threshold_days
        );
        report.pruned = prune_worktrees(repo_path, dry_run).await?;
        return Ok(report);
    };
    info!(
        "Cleaning worktrees older than {} (threshold: {} days)",
        cutoff.format(TIMESTAMP_FORMAT),
        threshold_days
    );

    let read_failed = |source| CleanupError::ReadRootFailed {
        path: worktree_root.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(worktree_root).await.map_err(read_failed)?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        // file_type() and metadata() do not follow symlinks.
        let is_dir = entry.file_type().await.map(|ft| ft.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(ts) => DateTime::<Local>::from(ts),
            Err(e) => {
                warn!("failed to read modified timestamp for {:?}: {}", entry.path(), e);
                continue;
            }
        };
        if modified < cutoff {
            candidates.push((entry.path(), modified));
        }
    }
    candidates.sort();

    for (dir_path, modified) in candidates {
        if dry_run {
            info!(
                "[dry-run] would remove worktree: {} (modified: {})",
                dir_path.display(),
                modified.format(TIMESTAMP_FORMAT)
            );
        } else {
            info!(
                "Removing worktree: {} (modified: {})",
                dir_path.display(),
                modified.format(TIMESTAMP_FORMAT)
            );
            tokio::fs::remove_dir_all(&dir_path)
                .await
                .map_err(|source| CleanupError::RemovalFailed {
                    path: dir_path.clone(),
                    source,
                })?;
        }
        report.reclaimed.push(dir_path);
    }

    match (report.reclaimed.len(), dry_run) {
        (0, _) => info!("No worktrees found older than {} days", threshold_days),
        (n, true) => info!("[dry-run] would remove {} worktrees", n),
        (n, false) => info!("Removed {} worktrees", n),
    }

    report.pruned = prune_worktrees(repo_path, dry_run).await?;
    Ok(report)
}

/// Run `git worktree prune` so git forgets worktrees whose directories are
/// gone. Returns whether the prune actually ran.
async fn prune_worktrees(repo_path: &Path, dry_run: bool) -> Result<bool, CleanupError> {
    let git_dir = repo_path.join(".git");
    if tokio::fs::symlink_metadata(&git_dir).await.is_err() {
        return Err(CleanupError::GitDirNotFound { path: git_dir });
    }

    if dry_run {
        info!("[dry-run] would run: git worktree prune in {}", repo_path.display());
        return Ok(false);
    }

    info!("Running git worktree prune in {}", repo_path.display());
    let output = run_git(repo_path, ["worktree", "prune"])
        .await
        .map_err(|e| CleanupError::PruneFailed {
            output: format!("failed to run git: {}", e),
        })?;
    if !output.status.success() {
        return Err(CleanupError::PruneFailed {
            output: combined_output(&output),
        });
    }
    let text = combined_output(&output);
    if !text.is_empty() {
        info!("Git worktree prune output: {}", text);
    }
    Ok(true)
}

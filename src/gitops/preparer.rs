//! One-time preparation of the shared repository.
//!
//! Must run to completion before any worker starts: it mutates the shared
//! checkout, which every worktree branches from.

use std::path::Path;

use tracing::{debug, info};

use super::repo::{has_remote, local_branch_exists, open_repository};
use super::{combined_output, run_git};
use crate::errors::PrepareError;

/// Validate the repository, check out `base_branch`, and pull if a remote is
/// configured. Without a remote the pull is skipped silently.
pub async fn prepare_repository(repo_path: &Path, base_branch: &str) -> Result<(), PrepareError> {
    debug!(repo = %repo_path.display(), base_branch, "preparing repository");

    let remote_configured = {
        let repo = open_repository(repo_path).map_err(|source| PrepareError::NotARepository {
            path: repo_path.to_path_buf(),
            source,
        })?;
        if !local_branch_exists(&repo, base_branch) {
            return Err(PrepareError::BranchNotFound {
                branch: base_branch.to_string(),
            });
        }
        has_remote(&repo)
    };

    let output = run_git(repo_path, ["checkout", base_branch])
        .await
        .map_err(PrepareError::Spawn)?;
    if !output.status.success() {
        return Err(PrepareError::CheckoutFailed {
            branch: base_branch.to_string(),
            output: combined_output(&output),
        });
    }

    if remote_configured {
        info!(base_branch, "pulling latest changes");
        let output = run_git(repo_path, ["pull"])
            .await
            .map_err(PrepareError::Spawn)?;
        if !output.status.success() {
            return Err(PrepareError::SyncFailed {
                output: combined_output(&output),
            });
        }
    } else {
        debug!("no remote configured, skipping pull");
    }

    Ok(())
}

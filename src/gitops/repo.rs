//! Read-only inspection of the shared repository.

use git2::Repository;
use std::path::Path;

/// Open the repository containing `path`, as `git rev-parse --git-dir` would.
pub fn open_repository(path: &Path) -> Result<Repository, git2::Error> {
    Repository::discover(path)
}

/// Whether `refs/heads/<branch>` exists.
pub fn local_branch_exists(repo: &Repository, branch: &str) -> bool {
    repo.find_reference(&format!("refs/heads/{}", branch)).is_ok()
}

/// Whether any remote is configured.
pub fn has_remote(repo: &Repository) -> bool {
    repo.remotes()
        .map(|remotes| remotes.iter().flatten().any(|name| !name.is_empty()))
        .unwrap_or(false)
}

//! Git plumbing for the shared repository and its per-issue worktrees.
//!
//! | Module      | Responsibility                                             |
//! |-------------|------------------------------------------------------------|
//! | `sanitize`  | Issue identifier → branch / directory name                 |
//! | `repo`      | Read-only repository inspection via `git2`                 |
//! | `preparer`  | One-time base branch checkout and sync                     |
//! | `worktree`  | Collision-checked worktree creation per issue              |
//! | `cleanup`   | Age-based worktree reclamation and `git worktree prune`    |
//! | `feature`   | `_feature.md` context file written into a fresh worktree   |
//!
//! Mutating operations shell out to the `git` binary; inspection goes through
//! `git2` so no process is spawned just to ask a question.

pub mod cleanup;
pub mod feature;
pub mod preparer;
pub mod repo;
pub mod sanitize;
pub mod worktree;

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;

pub use cleanup::{CleanupReport, clean_worktrees};
pub use feature::write_feature_file;
pub use preparer::prepare_repository;
pub use sanitize::sanitize_branch_name;
pub use worktree::{AtomicClaim, CheckThenCreate, WorktreeAllocator, create_worktree_for_issue};

/// Run `git <args>` in `dir`, capturing stdout and stderr.
pub(crate) async fn run_git<I, S>(dir: &Path, args: I) -> std::io::Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
}

/// Stdout and stderr of a finished command, joined and trimmed.
pub(crate) fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut combined = String::new();
    if !stdout.trim().is_empty() {
        combined.push_str(stdout.trim());
    }
    if !stderr.trim().is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(stderr.trim());
    }
    match output.status.code() {
        Some(code) if !output.status.success() => format!("{} (exit code: {})", combined, code),
        _ => combined,
    }
}

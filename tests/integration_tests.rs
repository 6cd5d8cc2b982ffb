//! End-to-end tests for the `monday` binary.
//!
//! Nothing here talks to Linear: every command under test either fails
//! before reaching the tracker or never needs it.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A `monday` command isolated from the caller's environment and config.
fn monday(dir: &TempDir) -> Command {
    let config = dir.path().join("empty.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let mut cmd = cargo_bin_cmd!("monday");
    cmd.current_dir(dir.path())
        .env_remove("LINEAR_API_KEY")
        .env_remove("SERVER_API_KEY")
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config);
    cmd
}

fn init_repo(dir: &Path) -> PathBuf {
    let path = dir.join("repo");
    git2::Repository::init(&path).unwrap();
    path
}

fn age_dir(path: &Path, days: u64) {
    let then = SystemTime::now() - Duration::from_secs(days * 24 * 60 * 60);
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(then)).unwrap();
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("monday")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("start"))
            .stdout(predicate::str::contains("cleanup"))
            .stdout(predicate::str::contains("workflow"))
            .stdout(predicate::str::contains("serve"));
    }

    #[test]
    fn test_version() {
        cargo_bin_cmd!("monday")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("monday"));
    }

    #[test]
    fn test_start_help_lists_flags() {
        cargo_bin_cmd!("monday")
            .args(["start", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--concurrency"))
            .stdout(predicate::str::contains("--base-branch"))
            .stdout(predicate::str::contains("--dry-run"))
            .stdout(predicate::str::contains("--launcher"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let dir = TempDir::new().unwrap();
        monday(&dir)
            .args(["--log-format", "yaml", "cleanup", "repo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value 'yaml'"));
    }
}

mod start {
    use super::*;

    #[test]
    fn test_requires_issue_and_repo() {
        let dir = TempDir::new().unwrap();
        monday(&dir).args(["start", "DEL-1"]).assert().failure();
    }

    #[test]
    fn test_rejects_invalid_issue_identifier() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .args(["start", "not-an-issue!"])
            .arg(&repo)
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid issue reference"));
    }

    #[test]
    fn test_requires_linear_api_key() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .args(["start", "DEL-1"])
            .arg(&repo)
            .arg("--worktree-root")
            .arg(dir.path().join("wt"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Linear API key is required"));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .args(["start", "DEL-1"])
            .arg(&repo)
            .args(["--concurrency", "0", "--api-key", "k"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("concurrency must be at least 1"));
    }

    #[test]
    fn test_rejects_oversized_concurrency_without_panicking() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .args(["start", "DEL-1"])
            .arg(&repo)
            .args(["--concurrency", "18446744073709551615", "--api-key", "k"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("concurrency must be at most"));
    }
}

mod cleanup {
    use super::*;

    #[test]
    fn test_requires_worktree_root() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .arg("cleanup")
            .arg(&repo)
            .assert()
            .failure()
            .stderr(predicate::str::contains("worktree root is required"));
    }

    #[test]
    fn test_missing_root_is_nothing_to_do() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        monday(&dir)
            .arg("cleanup")
            .arg(&repo)
            .arg("--worktree-root")
            .arg(dir.path().join("does-not-exist"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Reclaimed 0 worktree(s)"));
    }

    #[test]
    fn test_negative_days_rejected_before_touching_disk() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        let root = dir.path().join("wt");
        let stale = root.join("DEL-1");
        fs::create_dir_all(&stale).unwrap();
        age_dir(&stale, 30);

        monday(&dir)
            .arg("cleanup")
            .arg(&repo)
            .arg("--worktree-root")
            .arg(&root)
            .args(["--cleanup-days", "-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("non-negative"));

        assert!(stale.exists());
    }

    #[test]
    fn test_removes_only_stale_worktrees() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        let root = dir.path().join("wt");
        let stale = root.join("DEL-1");
        let fresh = root.join("DEL-2");
        fs::create_dir_all(&stale).unwrap();
        fs::create_dir_all(&fresh).unwrap();
        age_dir(&stale, 10);

        monday(&dir)
            .arg("cleanup")
            .arg(&repo)
            .arg("--worktree-root")
            .arg(&root)
            .args(["--cleanup-days", "7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("DEL-1"))
            .stdout(predicate::str::contains("Reclaimed 1 worktree(s)"));

        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_dry_run_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path());
        let root = dir.path().join("wt");
        let stale = root.join("DEL-1");
        fs::create_dir_all(&stale).unwrap();
        age_dir(&stale, 10);

        monday(&dir)
            .arg("cleanup")
            .arg(&repo)
            .arg("--worktree-root")
            .arg(&root)
            .arg("--dry-run")
            .assert()
            .success()
            .stdout(predicate::str::contains("Would reclaim 1 worktree(s)"));

        assert!(stale.exists());
    }
}

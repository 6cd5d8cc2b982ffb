//! Cleanup-only mode: `monday cleanup`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use console::style;
use monday::config::{CliOverrides, MondayToml, Settings};
use monday::gitops::clean_worktrees;

use super::super::CleanupArgs;

pub async fn cmd_cleanup(config: Option<&Path>, args: &CleanupArgs) -> Result<ExitCode> {
    let file = MondayToml::discover(config, Some(&args.repo))?;
    let settings = Settings::from_process_env(
        &file,
        &CliOverrides {
            worktree_root: args.worktree_root.clone(),
            cleanup_days: args.cleanup_days,
            ..Default::default()
        },
    )?;
    let root = settings.require_worktree_root()?;

    let report = clean_worktrees(root, &args.repo, settings.cleanup_days, args.dry_run).await?;

    for path in &report.reclaimed {
        println!("  {} {}", style("-").red(), path.display());
    }
    let verb = if report.dry_run { "Would reclaim" } else { "Reclaimed" };
    println!(
        "{} {} worktree(s) older than {} day(s)",
        style(verb).bold(),
        report.reclaimed.len(),
        settings.cleanup_days
    );
    Ok(ExitCode::SUCCESS)
}

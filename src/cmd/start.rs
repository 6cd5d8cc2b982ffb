//! Multi-issue worktree run: `monday start`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use monday::config::{CliOverrides, MondayToml, Settings};
use monday::issue_ref::IssueRef;
use monday::launcher::{AgentLauncher, Launcher, NoopLauncher, TerminalLauncher};
use monday::orchestrator::{Orchestrator, RunOptions, RunReport};
use monday::pool::WorkerOutcome;

use super::super::{LauncherKind, StartArgs};
use super::{agent_runner, linear_client};

pub async fn cmd_start(config: Option<&Path>, args: &StartArgs) -> Result<ExitCode> {
    let (repo, issue_args) = match args.targets.split_last() {
        Some((repo, issues)) if !issues.is_empty() => (PathBuf::from(repo), issues),
        _ => bail!("at least one issue identifier and a repository path are required"),
    };

    let issues = issue_args
        .iter()
        .map(|raw| IssueRef::resolve(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let file = MondayToml::discover(config, Some(&repo))?;
    let settings = Settings::from_process_env(
        &file,
        &CliOverrides {
            linear_api_key: args.api_key.clone(),
            linear_endpoint: args.linear_endpoint.clone(),
            base_branch: args.base_branch.clone(),
            worktree_root: args.worktree_root.clone(),
            concurrency: args.concurrency,
            cleanup_days: args.cleanup_days,
            ..Default::default()
        },
    )?;

    let tracker = Arc::new(linear_client(&settings)?);
    let worktree_root = settings.require_worktree_root()?.to_path_buf();

    let launcher: Arc<dyn Launcher> = match args.launcher {
        LauncherKind::Terminal => Arc::new(TerminalLauncher::new(settings.terminal_command.clone())),
        LauncherKind::Agent => Arc::new(AgentLauncher::new(agent_runner(&settings))),
        LauncherKind::Noop => Arc::new(NoopLauncher),
    };

    let repo_path = repo
        .canonicalize()
        .with_context(|| format!("Repository path does not exist: {}", repo.display()))?;

    let orchestrator = Orchestrator::new(
        tracker,
        launcher,
        RunOptions {
            repo_path,
            worktree_root,
            base_branch: settings.base_branch.clone(),
            concurrency: settings.concurrency,
            cleanup_days: settings.cleanup_days,
            dry_run: args.dry_run,
            skip_cleanup: args.skip_cleanup,
        },
    );

    let report = orchestrator.run(issues).await?;
    print_summary(&report);

    Ok(if report.pool.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(report: &RunReport) {
    if let Some(cleanup) = &report.cleanup {
        let verb = if cleanup.dry_run { "Would reclaim" } else { "Reclaimed" };
        println!("{} {} stale worktree(s)", verb, cleanup.reclaimed.len());
    }

    println!();
    for outcome in &report.pool.outcomes {
        match outcome {
            WorkerOutcome::Succeeded { issue_id } => {
                println!("  {} {}", style("✓").green().bold(), issue_id);
            }
            WorkerOutcome::Failed { issue_id, error } => {
                println!("  {} {}: {}", style("✗").red().bold(), issue_id, error);
            }
        }
    }
    println!();

    let pool = &report.pool;
    let errors = if pool.error_count > 0 {
        style(format!("{} failed", pool.error_count)).red().bold()
    } else {
        style(format!("{} failed", pool.error_count)).dim()
    };
    println!(
        "Summary: {}, {}",
        style(format!("{} succeeded", pool.success_count)).green().bold(),
        errors
    );
}

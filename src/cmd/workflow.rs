//! Single-issue pull request flow: `monday workflow`.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use monday::config::{CliOverrides, MondayToml, Settings};
use monday::issue_ref::IssueRef;
use monday::tracker::IssueFilter;
use monday::workflow::{GhCli, IssueWorkflow, WorkflowOptions, select_issue};

use super::super::WorkflowArgs;
use super::{agent_runner, linear_client};

pub async fn cmd_workflow(config: Option<&Path>, args: &WorkflowArgs) -> Result<ExitCode> {
    let file = MondayToml::discover(config, None)?;
    let settings = Settings::from_process_env(
        &file,
        &CliOverrides {
            linear_api_key: args.api_key.clone(),
            linear_endpoint: args.linear_endpoint.clone(),
            workdir: args.workdir.clone(),
            ..Default::default()
        },
    )?;
    let client = linear_client(&settings)?;

    let issue_ref = match &args.issue {
        Some(raw) => IssueRef::resolve(raw)?,
        None => {
            let filter = IssueFilter {
                team: args.team.clone(),
                project: args.project.clone(),
                label: args.label.clone(),
            };
            select_issue(&client, filter).await?
        }
    };

    let workflow = IssueWorkflow::new(
        Arc::new(client),
        agent_runner(&settings),
        Arc::new(GhCli::new(settings.github_token.clone())),
        WorkflowOptions {
            repo_url: args.repo_url.clone(),
            workdir: settings.workdir.clone(),
        },
    );
    let report = workflow.run(&issue_ref).await?;

    println!(
        "{} {} {}",
        style("✓").green().bold(),
        report.issue_id,
        report.title
    );
    println!("  Branch:       {}", report.branch);
    println!("  Pull request: {}", style(&report.pr_url).cyan());
    Ok(ExitCode::SUCCESS)
}

//! HTTP trigger server: `monday serve`.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use monday::config::{CliOverrides, MondayToml, Settings};
use monday::server::{AppState, start_server};
use monday::workflow::GhCli;

use super::super::ServeArgs;
use super::{agent_runner, linear_client};

pub async fn cmd_serve(config: Option<&Path>, args: &ServeArgs) -> Result<ExitCode> {
    let file = MondayToml::discover(config, None)?;
    let settings = Settings::from_process_env(
        &file,
        &CliOverrides {
            linear_endpoint: args.linear_endpoint.clone(),
            port: args.port,
            workdir: args.workdir.clone(),
            ..Default::default()
        },
    )?;

    let api_key = settings.require_server_api_key()?.to_string();
    let tracker = Arc::new(linear_client(&settings)?);
    tokio::fs::create_dir_all(&settings.workdir)
        .await
        .with_context(|| format!("Failed to create workdir {}", settings.workdir.display()))?;

    let state = Arc::new(AppState {
        api_key,
        tracker,
        agent: agent_runner(&settings),
        pull_requests: Arc::new(GhCli::new(settings.github_token.clone())),
        workdir: settings.workdir.clone(),
    });
    start_server(state, settings.port).await?;
    Ok(ExitCode::SUCCESS)
}

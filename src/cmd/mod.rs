//! CLI command implementations.
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `start`    | `Start`          |
//! | `cleanup`  | `Cleanup`        |
//! | `workflow` | `Workflow`       |
//! | `serve`    | `Serve`          |

pub mod cleanup;
pub mod serve;
pub mod start;
pub mod workflow;

use std::sync::Arc;

use anyhow::Result;
use monday::agent::{AgentRunner, CommandAgent, DockerAgent};
use monday::config::Settings;
use monday::tracker::LinearClient;

pub use cleanup::cmd_cleanup;
pub use serve::cmd_serve;
pub use start::cmd_start;
pub use workflow::cmd_workflow;

/// Linear client for the resolved key and endpoint.
pub(crate) fn linear_client(settings: &Settings) -> Result<LinearClient> {
    let key = settings.require_linear_api_key()?;
    Ok(LinearClient::new(key)?.with_endpoint(settings.linear_endpoint.clone()))
}

/// Docker when an image is configured, otherwise the local agent command.
/// `OPENAI_API_KEY` is forwarded either way.
pub(crate) fn agent_runner(settings: &Settings) -> Arc<dyn AgentRunner> {
    let args = settings.agent_args.clone();
    match &settings.docker_image {
        Some(image) => {
            let mut agent = DockerAgent::new(image.clone(), args);
            if let Some(key) = &settings.openai_api_key {
                agent = agent.with_env("OPENAI_API_KEY", key.clone());
            }
            Arc::new(agent)
        }
        None => {
            let mut agent = CommandAgent::new(settings.agent_command.clone(), args);
            if let Some(key) = &settings.openai_api_key {
                agent = agent.with_env("OPENAI_API_KEY", key.clone());
            }
            Arc::new(agent)
        }
    }
}

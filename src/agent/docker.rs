use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{AgentOutcome, AgentRunner, run_to_completion, working_tree_changed};
use crate::errors::AgentError;

const CONTAINER_WORKDIR: &str = "/workspace";

/// Runs the agent CLI inside a throwaway container with the working
/// directory bind-mounted at `/workspace`.
#[derive(Debug, Clone)]
pub struct DockerAgent {
    image: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl DockerAgent {
    pub fn new(image: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            image: image.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Arguments passed to `docker`.
    pub fn docker_args(&self, prompt: &str, workdir: &Path) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", workdir.display(), CONTAINER_WORKDIR),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
        ];
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(self.image.clone());
        args.extend(self.args.iter().cloned());
        args.push(prompt.to_string());
        args
    }
}

#[async_trait]
impl AgentRunner for DockerAgent {
    async fn execute(&self, prompt: &str, workdir: &Path) -> Result<AgentOutcome, AgentError> {
        info!("Running {} in docker for {}", self.image, workdir.display());
        let mut cmd = Command::new("docker");
        cmd.args(self.docker_args(prompt, workdir));
        run_to_completion(cmd, "docker").await?;
        let changed = working_tree_changed(workdir).await?;
        Ok(AgentOutcome { changed })
    }
}

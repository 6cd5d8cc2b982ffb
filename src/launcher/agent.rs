use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::Launcher;
use crate::agent::{AgentRunner, build_prompt};
use crate::errors::AgentError;
use crate::tracker::IssueDetails;

/// Hands the worktree straight to an agent and waits for it to finish.
#[derive(Clone)]
pub struct AgentLauncher {
    runner: Arc<dyn AgentRunner>,
}

impl AgentLauncher {
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Launcher for AgentLauncher {
    fn name(&self) -> &'static str {
        "agent"
    }

    async fn launch(
        &self,
        issue_id: &str,
        issue: &IssueDetails,
        worktree: &Path,
    ) -> Result<(), AgentError> {
        let prompt = build_prompt(issue);
        let outcome = self.runner.execute(&prompt, worktree).await?;
        if outcome.changed {
            info!("[{}] agent left changes in {}", issue_id, worktree.display());
        } else {
            warn!("[{}] agent made no changes", issue_id);
        }
        Ok(())
    }
}

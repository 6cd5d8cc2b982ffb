//! Handoff of a prepared worktree to whoever does the work.
//!
//! | Launcher           | Handoff                                              |
//! |--------------------|------------------------------------------------------|
//! | `TerminalLauncher` | New macOS Terminal tab in the worktree               |
//! | `AgentLauncher`    | Runs an [`AgentRunner`](crate::agent::AgentRunner)   |
//! | `NoopLauncher`     | Leaves the worktree for the operator                 |

pub mod agent;
pub mod terminal;

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::errors::AgentError;
use crate::tracker::IssueDetails;

pub use agent::AgentLauncher;
pub use terminal::TerminalLauncher;

#[async_trait]
pub trait Launcher: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    async fn launch(
        &self,
        issue_id: &str,
        issue: &IssueDetails,
        worktree: &Path,
    ) -> Result<(), AgentError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLauncher;

#[async_trait]
impl Launcher for NoopLauncher {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn launch(
        &self,
        issue_id: &str,
        _issue: &IssueDetails,
        worktree: &Path,
    ) -> Result<(), AgentError> {
        info!("[{}] worktree ready at {}", issue_id, worktree.display());
        Ok(())
    }
}

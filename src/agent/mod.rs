//! AI coding agent invocation.
//!
//! The agent is a black box: it gets a prompt and a working directory, it may
//! modify files there, and it exits. [`AgentRunner::execute`] reports whether
//! the working tree changed, judged by `git status --porcelain`.
//!
//! | Module    | Runner                                                 |
//! |-----------|--------------------------------------------------------|
//! | `command` | Local CLI (e.g. `codex`), prompt as the last argument  |
//! | `docker`  | Same CLI inside a container with the workdir mounted   |
//! | `prompt`  | Prompt text built from an issue                        |

pub mod command;
pub mod docker;
pub mod prompt;

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::AgentError;
use crate::gitops::combined_output;

pub use command::CommandAgent;
pub use docker::DockerAgent;
pub use prompt::build_prompt;

/// Result of one agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentOutcome {
    /// The working tree has uncommitted changes after the run.
    pub changed: bool,
}

#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn execute(&self, prompt: &str, workdir: &Path) -> Result<AgentOutcome, AgentError>;
}

/// Run `command` to completion, logging its output. A non-zero exit becomes
/// [`AgentError::AgentInvocationFailed`] carrying the combined output.
pub(crate) async fn run_to_completion(
    mut command: Command,
    program: &str,
) -> Result<(), AgentError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| AgentError::SpawnFailed {
            program: program.to_string(),
            source,
        })?;

    let text = combined_output(&output);
    for line in text.lines() {
        debug!(target: "monday::agent::output", "{}", line);
    }
    if !output.status.success() {
        return Err(AgentError::AgentInvocationFailed {
            exit_code: output.status.code(),
            output: text,
        });
    }
    info!("{} finished successfully", program);
    Ok(())
}

/// Whether `workdir` has staged, unstaged or untracked changes.
pub async fn working_tree_changed(workdir: &Path) -> Result<bool, AgentError> {
    let output = crate::gitops::run_git(workdir, ["status", "--porcelain"])
        .await
        .map_err(|source| AgentError::SpawnFailed {
            program: "git".to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(AgentError::AgentInvocationFailed {
            exit_code: output.status.code(),
            output: format!("git status failed: {}", combined_output(&output)),
        });
    }
    Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
}

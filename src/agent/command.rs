use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{AgentOutcome, AgentRunner, run_to_completion, working_tree_changed};
use crate::errors::AgentError;

/// Runs a local agent CLI in the working directory: `<program> <args>... <prompt>`.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    /// Set an environment variable for the agent process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AgentRunner for CommandAgent {
    async fn execute(&self, prompt: &str, workdir: &Path) -> Result<AgentOutcome, AgentError> {
        info!("Running {} in {}", self.program, workdir.display());
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(prompt)
            .current_dir(workdir)
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        run_to_completion(cmd, &self.program).await?;
        let changed = working_tree_changed(workdir).await?;
        Ok(AgentOutcome { changed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitops::test_support::init_repo;
    use tempfile::tempdir;

    fn sh(script: &str) -> CommandAgent {
        // `sh -c SCRIPT PROMPT` binds the prompt to $0.
        CommandAgent::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_prompt_is_last_argument_and_change_detected() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        let agent = sh(r#"printf '%s' "$0" > prompt.txt"#);

        let outcome = agent.execute("Implement feature: X", &repo).await.unwrap();

        assert!(outcome.changed);
        let written = std::fs::read_to_string(repo.join("prompt.txt")).unwrap();
        assert_eq!(written, "Implement feature: X");
    }

    #[tokio::test]
    async fn test_no_change_reported() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        let outcome = sh("true").execute("p", &repo).await.unwrap();
        assert!(!outcome.changed);
    }

    #[tokio::test]
    async fn test_env_is_forwarded() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        let agent = sh(r#"printf '%s' "$OPENAI_API_KEY" > key.txt"#)
            .with_env("OPENAI_API_KEY", "sk-test");
        agent.execute("p", &repo).await.unwrap();
        assert_eq!(std::fs::read_to_string(repo.join("key.txt")).unwrap(), "sk-test");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_output() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        let err = sh("echo boom >&2; exit 3").execute("p", &repo).await.unwrap_err();
        match err {
            AgentError::AgentInvocationFailed { exit_code, output } => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_failure() {
        let dir = tempdir().unwrap();
        let agent = CommandAgent::new("monday-no-such-agent-binary", vec![]);
        let err = agent.execute("p", dir.path()).await.unwrap_err();
        assert!(matches!(err, AgentError::SpawnFailed { .. }));
    }
}

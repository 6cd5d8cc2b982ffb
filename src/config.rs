//! Layered configuration for monday.
//!
//! Precedence, lowest first: built-in defaults, `monday.toml`, environment,
//! command-line flags. Resolution is a pure function of those three inputs;
//! only [`Settings::from_process_env`] reads the real environment.
//!
//! # Configuration File Format
//!
//! ```toml
//! [linear]
//! endpoint = "https://api.linear.app/graphql"
//!
//! [git]
//! base_branch = "develop"
//! worktree_root = "/Users/me/worktrees"
//! cleanup_days = 7
//!
//! [workers]
//! concurrency = 3
//!
//! [agent]
//! command = "codex"
//! args = ["--approval-mode", "full-auto", "-q"]
//! docker_image = "ghcr.io/acme/codex:latest"
//! terminal_command = "codex"
//!
//! [server]
//! port = 8080
//! workdir = "/var/lib/monday"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::tracker::DEFAULT_LINEAR_ENDPOINT;

pub const CONFIG_DIR_NAME: &str = ".monday";
pub const CONFIG_FILE_NAME: &str = "monday.toml";

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_BASE_BRANCH: &str = "develop";
pub const DEFAULT_CLEANUP_DAYS: i64 = 7;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AGENT_COMMAND: &str = "codex";

fn default_agent_args() -> Vec<String> {
    ["--approval-mode", "full-auto", "-q"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinearSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitSection {
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub worktree_root: Option<PathBuf>,
    #[serde(default)]
    pub cleanup_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkersSection {
    #[serde(default)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSection {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Run the agent in this image instead of on the host.
    #[serde(default)]
    pub docker_image: Option<String>,
    /// Command started in the Terminal tab; defaults to the agent command.
    #[serde(default)]
    pub terminal_command: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

/// Contents of `monday.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MondayToml {
    #[serde(default)]
    pub linear: LinearSection,
    #[serde(default)]
    pub git: GitSection,
    #[serde(default)]
    pub workers: WorkersSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl MondayToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse monday.toml")
    }

    /// Load the first config file found: the explicit path (which must
    /// exist), then `<repo>/.monday/monday.toml`, then the user config
    /// directory. No file at all yields the defaults.
    pub fn discover(explicit: Option<&Path>, repo: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidates = repo
            .map(|r| r.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .into_iter()
            .chain(dirs::config_dir().map(|d| d.join("monday").join("config.toml")));
        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!("Loading config from {}", candidate.display());
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub linear_api_key: Option<String>,
    pub linear_endpoint: Option<String>,
    pub base_branch: Option<String>,
    pub worktree_root: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub cleanup_days: Option<i64>,
    pub port: Option<u16>,
    pub workdir: Option<PathBuf>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub linear_api_key: Option<String>,
    pub linear_endpoint: String,
    pub github_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub server_api_key: Option<String>,
    pub base_branch: String,
    pub worktree_root: Option<PathBuf>,
    pub cleanup_days: i64,
    pub concurrency: usize,
    pub agent_command: String,
    pub agent_args: Vec<String>,
    pub docker_image: Option<String>,
    pub terminal_command: String,
    pub port: u16,
    pub workdir: PathBuf,
}

impl Settings {
    /// Merge defaults, file, environment (via `env`) and CLI overrides.
    /// Empty environment values count as unset.
    pub fn resolve<F>(file: &MondayToml, env: F, cli: &CliOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let env_port = match env("PORT") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .with_context(|| format!("PORT must be a port number, got '{}'", raw))?,
            ),
            None => None,
        };

        let agent_command = env("MONDAY_AGENT_CMD")
            .or_else(|| file.agent.command.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_COMMAND.to_string());

        let settings = Self {
            linear_api_key: cli
                .linear_api_key
                .clone()
                .or_else(|| env("LINEAR_API_KEY"))
                .or_else(|| file.linear.api_key.clone()),
            linear_endpoint: cli
                .linear_endpoint
                .clone()
                .or_else(|| file.linear.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_LINEAR_ENDPOINT.to_string()),
            github_token: env("GITHUB_TOKEN"),
            openai_api_key: env("OPENAI_API_KEY"),
            server_api_key: env("SERVER_API_KEY"),
            base_branch: cli
                .base_branch
                .clone()
                .or_else(|| file.git.base_branch.clone())
                .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            worktree_root: cli
                .worktree_root
                .clone()
                .or_else(|| file.git.worktree_root.clone()),
            cleanup_days: cli
                .cleanup_days
                .or(file.git.cleanup_days)
                .unwrap_or(DEFAULT_CLEANUP_DAYS),
            concurrency: cli
                .concurrency
                .or(file.workers.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            terminal_command: file
                .agent
                .terminal_command
                .clone()
                .unwrap_or_else(|| agent_command.clone()),
            agent_command,
            agent_args: file.agent.args.clone().unwrap_or_else(default_agent_args),
            docker_image: file.agent.docker_image.clone(),
            port: cli
                .port
                .or(env_port)
                .or(file.server.port)
                .unwrap_or(DEFAULT_PORT),
            workdir: cli
                .workdir
                .clone()
                .or_else(|| file.server.workdir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        if settings.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if settings.concurrency > Semaphore::MAX_PERMITS {
            bail!(
                "concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                settings.concurrency
            );
        }
        Ok(settings)
    }

    /// [`Settings::resolve`] against the real process environment.
    pub fn from_process_env(file: &MondayToml, cli: &CliOverrides) -> Result<Self> {
        Self::resolve(file, |key| std::env::var(key).ok(), cli)
    }

    pub fn require_linear_api_key(&self) -> Result<&str> {
        self.linear_api_key.as_deref().context(
            "Linear API key is required (set LINEAR_API_KEY, use --api-key, or [linear] api_key)",
        )
    }

    pub fn require_worktree_root(&self) -> Result<&Path> {
        self.worktree_root
            .as_deref()
            .context("worktree root is required (use --worktree-root or [git] worktree_root)")
    }

    pub fn require_server_api_key(&self) -> Result<&str> {
        self.server_api_key
            .as_deref()
            .context("SERVER_API_KEY environment variable is required")
    }
}

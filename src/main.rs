use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use monday::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "monday")]
#[command(version, about = "Turn Linear issues into isolated git worktrees and pull requests")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Path to a monday.toml. Defaults to <repo>/.monday/monday.toml, then the user config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create one worktree per issue and hand each to the launcher
    Start(StartArgs),
    /// Reclaim aged worktrees and prune git metadata
    Cleanup(CleanupArgs),
    /// Clone, run the agent and open a pull request for a single issue
    Workflow(WorkflowArgs),
    /// Serve the HTTP trigger for the single-issue workflow
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LauncherKind {
    /// Open a macOS Terminal tab running the agent command
    Terminal,
    /// Run the agent headless in the worktree
    Agent,
    /// Only create worktrees
    #[value(name = "none")]
    Noop,
}

#[derive(Args)]
pub struct StartArgs {
    /// Issue identifiers (e.g. DEL-163 or a linear.app URL) followed by the repository path
    #[arg(value_name = "ISSUE... REPO", required = true, num_args = 2..)]
    pub targets: Vec<String>,

    /// Directory that holds one worktree per issue
    #[arg(long)]
    pub worktree_root: Option<PathBuf>,

    /// Maximum number of issues processed at once
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Branch every worktree is created from
    #[arg(long)]
    pub base_branch: Option<String>,

    /// Reclaim worktrees older than this many days before starting
    #[arg(long, allow_negative_numbers = true)]
    pub cleanup_days: Option<i64>,

    #[arg(long)]
    pub skip_cleanup: bool,

    /// Create worktrees and mark issues in progress, but do not launch or delete anything
    #[arg(long)]
    pub dry_run: bool,

    /// Linear API key (overrides LINEAR_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub linear_endpoint: Option<String>,

    #[arg(long, value_enum, default_value = "terminal")]
    pub launcher: LauncherKind,
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Repository whose worktree metadata is pruned
    pub repo: PathBuf,

    #[arg(long)]
    pub worktree_root: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    pub cleanup_days: Option<i64>,

    /// Report what would be removed without removing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct WorkflowArgs {
    /// Issue identifier. When omitted, the first issue matching the filters is used.
    pub issue: Option<String>,

    /// Repository to clone
    #[arg(long)]
    pub repo_url: String,

    /// Directory the repository is cloned into
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    #[arg(long)]
    pub team: Option<String>,

    /// Project name filter
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub linear_endpoint: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory per-request clones are made in
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    #[arg(long)]
    pub linear_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_format) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        return ExitCode::FAILURE;
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Start(args) => cmd::cmd_start(config, args).await,
        Commands::Cleanup(args) => cmd::cmd_cleanup(config, args).await,
        Commands::Workflow(args) => cmd::cmd_workflow(config, args).await,
        Commands::Serve(args) => cmd::cmd_serve(config, args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

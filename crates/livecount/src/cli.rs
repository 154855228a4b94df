//! Clap derive structures for the `livecount` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// livecount -- live visitor counts from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "livecount",
    version,
    about = "Watch live visitor counts from an analytics pipe endpoint",
    long_about = "Polls the active-visitors pipe of a site's analytics endpoint\n\
        every 60 seconds and prints the count as it changes. The last good\n\
        value is kept on screen through slow or failed refreshes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Site profile to use
    #[arg(long, short = 'p', env = "LIVECOUNT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file path (overrides the platform default)
    #[arg(long, env = "LIVECOUNT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Site uuid (overrides profile)
    #[arg(long, short = 's', env = "LIVECOUNT_SITE", global = true)]
    pub site: Option<String>,

    /// Analytics endpoint base URL (overrides profile)
    #[arg(long, short = 'e', env = "LIVECOUNT_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Read token for the analytics endpoint
    #[arg(long, env = "LIVECOUNT_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LIVECOUNT_OUTPUT",
        default_value = "plain",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LIVECOUNT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "LIVECOUNT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Refresh period in seconds
    #[arg(long, env = "LIVECOUNT_INTERVAL", global = true)]
    pub interval: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable status line (default)
    Plain,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll continuously and print each change until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Poll until the first settled count, print it, and exit
    Once(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Count visitors of a single resource (e.g. a post uuid)
    #[arg(long, short = 'r')]
    pub resource: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the resolved configuration (tokens redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

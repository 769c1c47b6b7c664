//! Clap derive structures for the `tigomon` CLI.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tigomon -- monitor Tigo CCA solar gateways from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tigomon",
    version,
    about = "Monitor Tigo CCA solar optimizers from the command line",
    long_about = "Reads per-panel production from a Tigo CCA gateway's local status pages.\n\n\
        Polls the gateway over the LAN, tracks which optimizers are active or stale,\n\
        and prints snapshots as tables, JSON, or YAML.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "TIGOMON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway host or IP (overrides profile)
    #[arg(long, short = 'H', env = "TIGOMON_HOST", global = true)]
    pub host: Option<String>,

    /// Basic-auth username (overrides profile)
    #[arg(long, short = 'u', env = "TIGOMON_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TIGOMON_OUTPUT",
        default_value = "table",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TIGOMON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one poll cycle and print every optimizer
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Poll continuously and print each published snapshot
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Show gateway identity and health
    #[command(alias = "gw")]
    Gateway,

    /// List optimizer firmware, hardware, and models
    #[command(alias = "inv")]
    Inventory,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show optimizers in this string / group (e.g. "A")
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Delay between cycles (e.g. "30s", "2m"; overrides profile)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Exit after this many snapshots
    #[arg(long, short = 'n')]
    pub count: Option<u32>,

    /// Only show optimizers in this string / group
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

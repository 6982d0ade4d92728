//! Clap derive structures for the `benchdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only clap types may appear here: `build.rs` includes this file.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// benchdeck -- drive a bench power-control panel from the command line
#[derive(Debug, Parser)]
#[command(
    name = "benchdeck",
    version,
    about = "Control bench power rails, service mode and USB ports",
    long_about = "Scriptable front-end for a bench power-control controller.\n\n\
        Switches the 5V / 12V / HV rails of four benches, enters and leaves\n\
        service mode with rail snapshot and restore, and reads the controller's\n\
        health, air pressure and action log.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "BENCHDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'u', env = "BENCHDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BENCHDECK_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates (TLS reverse proxies)
    #[arg(long, short = 'k', env = "BENCHDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BENCHDECK_TIMEOUT", global = true)]
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

/// On/off argument for switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show bench rails and service mode (or every channel with --all)
    #[command(alias = "st")]
    State(StateArgs),

    /// Switch one named channel
    Set(SetArgs),

    /// Switch all three rails of a bench (on: 5V, 12V, HV; off: HV, 12V, 5V)
    Rails(RailsArgs),

    /// Enter, leave or toggle service mode for a bench
    #[command(alias = "svc")]
    Service(ServiceArgs),

    /// Switch every rail and port off on all benches
    AllOff,

    /// Read the air pressure sensor
    Pressure,

    /// Show or change operator bench names
    Names(NamesArgs),

    /// Controller hardware health
    Health,

    /// Switch the data and VBUS halves of a USB port
    Usb(UsbArgs),

    /// Tail the controller's action log
    Logs(LogsArgs),

    /// Poll state continuously and print changes until interrupted
    Watch,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CHANNELS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StateArgs {
    /// List every channel instead of the bench summary
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Channel name (e.g. bench1_5v, lights, port3_vcc_en)
    pub channel: String,

    /// Desired state
    pub state: Switch,

    /// Send even if the channel is not in the known catalogue
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RailsArgs {
    /// Bench (1-4, b1, bench1)
    pub bench: String,

    /// Desired state for all three rails
    pub state: Switch,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVICE MODE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// Bench (1-4, b1, bench1)
    pub bench: String,

    #[arg(value_enum)]
    pub action: ServiceAction,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ServiceAction {
    /// Snapshot the rails, then enable service mode
    On,
    /// Disable service mode, then restore the rails snapshot
    Off,
    /// Flip the current service flag
    Toggle,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NAMES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NamesArgs {
    #[command(subcommand)]
    pub command: Option<NamesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum NamesCommand {
    /// List bench names
    List,

    /// Rename one bench (an empty name restores the default label)
    Set {
        /// Bench (1-4, b1, bench1)
        bench: String,

        /// New name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SYSTEM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsbArgs {
    /// USB port number
    #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
    pub port: u8,

    /// Data lines
    #[arg(long, default_value = "on")]
    pub data: Switch,

    /// VBUS power
    #[arg(long, default_value = "on")]
    pub vbus: Switch,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Number of most recent records (1-2000)
    #[arg(
        long,
        short = 'n',
        default_value = "50",
        value_parser = clap::value_parser!(u16).range(1..=2000)
    )]
    pub lines: u16,
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
    /// Create or extend the config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

//! `benchdeck-tui` — terminal panel for a bench power-control controller.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `benchdeck-core`'s [`Panel`](benchdeck_core::Panel): one card per bench
//! with rail toggles, a rails master and a hold-to-toggle service button,
//! the facility switches, an air pressure gauge and a terminal pane bound
//! to the controller's shell.
//!
//! Logs go to a file (default `/tmp/benchdeck-tui.log`) so they never
//! corrupt the terminal UI.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use benchdeck_core::config::DEFAULT_URL;
use benchdeck_core::{Panel, PanelConfig, TlsMode};

use crate::app::App;

/// Terminal panel for switching bench rails and service mode.
#[derive(Parser, Debug)]
#[command(name = "benchdeck-tui", version, about)]
struct Cli {
    /// Controller profile from the shared config file
    #[arg(short = 'p', long, env = "BENCHDECK_PROFILE")]
    profile: Option<String>,

    /// Controller URL (overrides the profile), e.g. http://bench-pi.local:8080
    #[arg(short = 'u', long, env = "BENCHDECK_URL")]
    url: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Start without the terminal pane
    #[arg(long)]
    no_terminal: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/benchdeck-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. The returned guard must live until exit so the
/// non-blocking writer flushes.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "benchdeck_tui={log_level},benchdeck_core={log_level},benchdeck_api={log_level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("benchdeck-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Flags over profile over defaults. An unknown `--profile` is an error;
/// with no profile at all the controller is expected at the default URL.
fn resolve_panel_config(cli: &Cli) -> Result<PanelConfig> {
    let cfg = benchdeck_config::load_config()?;
    let profile_name = cfg.active_profile_name(cli.profile.as_deref());

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => benchdeck_config::profile_to_panel_config(profile, &cfg.defaults)?,
        None if cli.profile.is_some() => {
            return Err(eyre!("profile '{profile_name}' not found in config"));
        }
        None => {
            let profile = benchdeck_config::Profile {
                url: DEFAULT_URL.into(),
                ..benchdeck_config::Profile::default()
            };
            benchdeck_config::profile_to_panel_config(&profile, &cfg.defaults)?
        }
    };

    if let Some(ref url) = cli.url {
        config.url = benchdeck_config::parse_url(url)?;
    }
    if cli.insecure {
        config.tls = TlsMode::DangerAcceptInvalid;
    }
    if cli.no_terminal {
        config.terminal_enabled = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks go in before the terminal switches to raw mode.
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    let config = resolve_panel_config(&cli)?;
    info!(
        url = %config.url,
        poll_ms = u64::try_from(config.poll_interval.as_millis()).unwrap_or(u64::MAX),
        terminal = config.terminal_enabled,
        "starting benchdeck-tui"
    );

    let client = config.client()?;
    let panel = Panel::new(client, config);
    let mut app = App::new(panel)?;
    app.run().await?;

    Ok(())
}

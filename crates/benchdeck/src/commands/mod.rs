//! Command dispatch: bridges CLI args -> panel operations -> output formatting.

pub mod channels;
pub mod config_cmd;
pub mod names;
pub mod service;
pub mod system;
pub mod util;
pub mod watch;

use benchdeck_core::{BenchClient, Panel};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    panel: &Panel<BenchClient>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::State(args) => channels::state(panel, &args, global).await,
        Command::Set(args) => channels::set(panel, args, global).await,
        Command::Rails(args) => channels::rails(panel, &args, global).await,
        Command::AllOff => channels::all_off(panel, global).await,
        Command::Service(args) => service::handle(panel, &args, global).await,
        Command::Names(args) => names::handle(panel, args, global).await,
        Command::Pressure => system::pressure(panel, global).await,
        Command::Health => system::health(panel, global).await,
        Command::Usb(args) => system::usb(panel, &args, global).await,
        Command::Logs(args) => system::logs(panel, &args, global).await,
        Command::Watch => watch::handle(panel, global).await,
        // Config and Completions never reach dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

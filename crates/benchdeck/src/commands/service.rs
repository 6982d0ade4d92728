//! Service mode command handler.
//!
//! The rail snapshot lives in this process only: `service on` followed by
//! `service off` in a later invocation leaves service mode without a
//! restore, which the outcome reports.

use serde::Serialize;

use benchdeck_core::{BenchClient, CommitOutcome, Panel};

use crate::cli::{GlobalOpts, ServiceAction, ServiceArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ServiceResult {
    bench: u8,
    service: bool,
    restored: Option<bool>,
    message: String,
}

pub async fn handle(
    panel: &Panel<BenchClient>,
    args: &ServiceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bench = util::parse_bench(&args.bench)?;

    let outcome = match args.action {
        ServiceAction::On => panel.commit_service(bench, true).await,
        ServiceAction::Off => panel.commit_service(bench, false).await,
        ServiceAction::Toggle => panel.toggle_service(bench).await,
    };

    let result = match &outcome {
        CommitOutcome::Entered { .. } => ServiceResult {
            bench: bench.number(),
            service: true,
            restored: None,
            message: outcome.to_string(),
        },
        CommitOutcome::Exited { restored, .. } => ServiceResult {
            bench: bench.number(),
            service: false,
            restored: Some(*restored),
            message: outcome.to_string(),
        },
        CommitOutcome::Failed { error, .. } => {
            return Err(CliError::ServiceFailed {
                bench: bench.to_string(),
                message: error.clone(),
            });
        }
    };

    let out = output::render_single(
        &global.output,
        &result,
        |r| r.message.clone(),
        |r| format!("bench{} service={}", r.bench, r.service),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

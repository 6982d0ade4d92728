//! Shared helpers for command handlers.

use std::io::IsTerminal;

use benchdeck_core::BenchId;

use crate::error::CliError;

/// Parse a bench argument (`3`, `b3`, `bench3`).
pub fn parse_bench(raw: &str) -> Result<BenchId, CliError> {
    Ok(raw.parse::<BenchId>()?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_forms() {
        assert_eq!(parse_bench("2").expect("plain number").number(), 2);
        assert_eq!(parse_bench("bench4").expect("wire name").number(), 4);
        assert!(matches!(
            parse_bench("bench5"),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(confirm("all-off", "Really?", true).expect("auto-approved"));
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use benchdeck_config::ConfigError;
use benchdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REQUEST: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to bench controller at {url}")]
    #[diagnostic(
        code(benchdeck::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             Reason: {reason}\n\
             Try: benchdeck health --url http://<host>:8080"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Controller rejected the request: {message}")]
    #[diagnostic(code(benchdeck::request_failed))]
    RequestFailed { message: String },

    #[error("Controller sent an unexpected response: {message}")]
    #[diagnostic(
        code(benchdeck::malformed_response),
        help("The controller and this CLI may be out of step. Re-run with -vv for request details.")
    )]
    MalformedResponse { message: String },

    #[error("Service mode change failed for {bench}: {message}")]
    #[diagnostic(
        code(benchdeck::service_failed),
        help("Check the bench with: benchdeck state")
    )]
    ServiceFailed { bench: String, message: String },

    #[error("Terminal channel error: {message}")]
    #[diagnostic(code(benchdeck::terminal))]
    Terminal { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Unknown channel '{name}'")]
    #[diagnostic(
        code(benchdeck::unknown_channel),
        help(
            "Run: benchdeck state --all to see known channels.\n\
             Use --force to send it anyway."
        )
    )]
    UnknownChannel { name: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(benchdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(benchdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: benchdeck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(benchdeck::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(benchdeck::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(benchdeck::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(benchdeck::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::RequestFailed { .. }
            | Self::MalformedResponse { .. }
            | Self::ServiceFailed { .. } => exit_code::REQUEST,
            Self::UnknownChannel { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::Request { message, .. } => Self::RequestFailed { message },

            CoreError::MalformedResponse { message } => Self::MalformedResponse { message },

            CoreError::ChannelDisconnected => Self::Terminal {
                message: "channel is not connected".into(),
            },

            CoreError::Terminal { message } => Self::Terminal { message },

            CoreError::UnknownBench { value } => Self::Validation {
                field: "bench".into(),
                reason: format!("'{value}' is not a bench (expected 1-4, b1-b4 or bench1-bench4)"),
            },

            CoreError::UnknownChannel { name } => Self::UnknownChannel { name },

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let unreachable = CliError::from(CoreError::Unreachable {
            url: "http://bench:8080".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(unreachable.exit_code(), exit_code::CONNECTION);

        let rejected = CliError::from(CoreError::Request {
            status: 400,
            message: "unknown channel".into(),
        });
        assert_eq!(rejected.exit_code(), exit_code::REQUEST);

        let bench = CliError::from(CoreError::UnknownBench { value: "9".into() });
        assert_eq!(bench.exit_code(), exit_code::USAGE);
    }
}

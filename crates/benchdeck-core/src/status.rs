// ── Status line ──
//
// Single reporting surface for command results and failures. Front-ends
// subscribe to it instead of scraping logs.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::service::CommitOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusLevel {
    #[default]
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl StatusLine {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }

    /// Failure of a named action: `"{action}: {error}"`.
    pub fn failed(action: &str, error: &CoreError) -> Self {
        Self::error(format!("{action}: {error}"))
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::info("Ready")
    }
}

impl From<&CommitOutcome> for StatusLine {
    fn from(outcome: &CommitOutcome) -> Self {
        let level = if outcome.is_failure() {
            StatusLevel::Error
        } else {
            StatusLevel::Success
        };
        Self::new(level, outcome.to_string())
    }
}

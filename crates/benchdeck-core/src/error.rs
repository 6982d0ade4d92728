// ── Core error types ──
//
// User-facing errors from benchdeck-core. The `From<benchdeck_api::Error>`
// impl keeps the three failure kinds the panel distinguishes (request,
// malformed response, disconnected channel) and folds transport detail
// into a reachability error.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach bench controller at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    // ── Backend errors ───────────────────────────────────────────────
    /// Non-success status, or a write acknowledged with `ok: false`.
    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // ── Terminal errors ──────────────────────────────────────────────
    #[error("Terminal channel is not connected")]
    ChannelDisconnected,

    #[error("Terminal error: {message}")]
    Terminal { message: String },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Unknown bench '{value}' (expected 1-4 or bench1-bench4)")]
    UnknownBench { value: String },

    #[error("Unknown channel '{name}'")]
    UnknownChannel { name: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// HTTP status for backend request failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<benchdeck_api::Error> for CoreError {
    fn from(err: benchdeck_api::Error) -> Self {
        use benchdeck_api::Error as Api;

        match err {
            Api::Request { status, .. } => Self::Request {
                status,
                message: err.status_text(),
            },
            Api::MalformedResponse { message, .. } => Self::MalformedResponse { message },
            Api::ChannelDisconnected => Self::ChannelDisconnected,
            Api::SocketConnect(message) => Self::Terminal { message },
            Api::SocketClosed { code, reason } => Self::Terminal {
                message: format!("closed with code {code}: {reason}"),
            },
            Api::Transport(ref e) => {
                if let Some(status) = e.status() {
                    Self::Request {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    Self::Unreachable {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => Self::Unreachable {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
        }
    }
}

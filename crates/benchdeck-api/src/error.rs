use thiserror::Error;

/// Top-level error type for the `benchdeck-api` crate.
///
/// Covers every failure mode of the bench controller surfaces:
/// HTTP transport, non-success responses, response shape, and the
/// terminal socket. `benchdeck-core` maps these into panel diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend responses ───────────────────────────────────────────
    /// The backend answered with a non-success status, or a write was
    /// acknowledged with `"ok": false`.
    #[error("Request failed (HTTP {status}): {body}")]
    Request { status: u16, body: String },

    /// The response body does not have the expected shape.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    // ── Terminal socket ─────────────────────────────────────────────
    /// Socket connection or handshake failed.
    #[error("Socket connection failed: {0}")]
    SocketConnect(String),

    /// Socket closed by the server.
    #[error("Socket closed (code {code}): {reason}")]
    SocketClosed { code: u16, reason: String },

    /// A send was attempted while the terminal channel is not open.
    /// Callers drop the payload; nothing is queued.
    #[error("Terminal channel is not connected")]
    ChannelDisconnected,
}

impl Error {
    /// HTTP status carried by a `Request` error or a transport status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the backend could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::SocketConnect(_) => true,
            _ => false,
        }
    }

    /// Short message suitable for a one-line status display.
    ///
    /// Backend failures are reported as `{"ok": false, "error": "..."}`;
    /// the `error` text is preferred over the raw body when present.
    pub fn status_text(&self) -> String {
        match self {
            Self::Request { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                    .unwrap_or_else(|| body.chars().take(120).collect());
                if detail.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {detail}")
                }
            }
            other => other.to_string(),
        }
    }
}

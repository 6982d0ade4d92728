// ── Runtime panel configuration ──
//
// Describes *how* to reach a bench controller and how the panel behaves.
// Never touches disk: the CLI/TUI builds a `PanelConfig` from
// `benchdeck-config` profiles and hands it in.

use std::time::Duration;

use benchdeck_api::{BenchClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_HOLD_THRESHOLD: Duration = Duration::from_millis(1500);
/// Shortest accepted hold threshold. Front-ends that infer a key release
/// from a pause in auto-repeat must pause for less than this.
pub const MIN_HOLD_THRESHOLD: Duration = Duration::from_millis(1000);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one panel session.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Controller root, e.g. `http://bench-pi.local:8080`.
    pub url: Url,
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Full-state poll period.
    pub poll_interval: Duration,
    /// How long a service button must be held before it commits.
    pub hold_threshold: Duration,
    /// Open the terminal channel on start.
    pub terminal_enabled: bool,
}

impl PanelConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            hold_threshold: DEFAULT_HOLD_THRESHOLD,
            terminal_enabled: true,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }

    /// Build the HTTP client for this panel.
    pub fn client(&self) -> Result<BenchClient, CoreError> {
        Ok(BenchClient::new(self.url.clone(), &self.transport())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PanelConfig::new(Url::parse(DEFAULT_URL).expect("valid default"));
        assert_eq!(config.url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.hold_threshold, Duration::from_millis(1500));
        assert!(config.terminal_enabled);
    }
}

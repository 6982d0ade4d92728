// ── Terminal bridge ──
//
// Passthrough between a terminal widget and the controller's terminal
// channel. Keystrokes go out verbatim, output comes back verbatim. The
// channel is opened once at start and re-opened only on explicit
// `reconnect`; there is no retry loop.

use std::fmt;

use benchdeck_api::socketio::socket_url;
use benchdeck_api::{TerminalChannel, TerminalEvent, TerminalSize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::error::CoreError;

const OUTPUT_CHANNEL_CAPACITY: usize = 1024;

/// Connection status shown next to the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TerminalStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    Error(String),
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Status change carried by a lifecycle event; `None` for output.
fn status_for(event: &TerminalEvent) -> Option<TerminalStatus> {
    match event {
        TerminalEvent::Connected => Some(TerminalStatus::Connected),
        TerminalEvent::Disconnected(_) => Some(TerminalStatus::Disconnected),
        TerminalEvent::Error(e) => Some(TerminalStatus::Error(e.clone())),
        TerminalEvent::Output(_) => None,
    }
}

/// One terminal pane's connection.
pub struct TerminalBridge {
    url: Url,
    size: TerminalSize,
    channel: Option<TerminalChannel>,
    forwarder: Option<JoinHandle<()>>,
    status: watch::Sender<TerminalStatus>,
    output: broadcast::Sender<String>,
    cancel: CancellationToken,
}

impl TerminalBridge {
    /// Prepare a bridge for the controller at `base`. Nothing is opened
    /// until [`open`](Self::open).
    pub fn new(base: &Url, size: TerminalSize, cancel: &CancellationToken) -> Result<Self, CoreError> {
        let url = socket_url(base)?;
        let (status, _) = watch::channel(TerminalStatus::Disconnected);
        let (output, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        Ok(Self {
            url,
            size,
            channel: None,
            forwarder: None,
            status,
            output,
            cancel: cancel.child_token(),
        })
    }

    pub fn status(&self) -> TerminalStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TerminalStatus> {
        self.status.subscribe()
    }

    /// Inbound terminal text, verbatim.
    pub fn subscribe_output(&self) -> broadcast::Receiver<String> {
        self.output.subscribe()
    }

    pub fn size(&self) -> TerminalSize {
        self.size
    }

    /// Open the channel, tearing down any previous one. Announces the
    /// current size once connected.
    pub fn open(&mut self) {
        self.close();
        info!(url = %self.url, "opening terminal channel");
        self.status.send_replace(TerminalStatus::Connecting);

        let mut channel = TerminalChannel::connect(self.url.clone(), self.size, &self.cancel);
        let mut events = channel.events();
        let status = self.status.clone();
        let output = self.output.clone();

        self.forwarder = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(TerminalEvent::Output(text)) => {
                        let _ = output.send(text);
                    }
                    Ok(event) => {
                        let finished = !matches!(event, TerminalEvent::Connected);
                        if let Some(next) = status_for(&event) {
                            status.send_replace(next);
                        }
                        if finished {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "terminal output lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        self.channel = Some(channel);
    }

    /// Manual reconnect: close and open again.
    pub fn reconnect(&mut self) {
        self.open();
    }

    /// Close the channel if open.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.shutdown();
        }
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
        self.status.send_replace(TerminalStatus::Disconnected);
    }

    /// Forward keystroke text. Dropped with `ChannelDisconnected` when the
    /// channel is not open; nothing is queued.
    pub fn send_keys(&self, text: &str) -> Result<(), CoreError> {
        let channel = self.channel.as_ref().ok_or(CoreError::ChannelDisconnected)?;
        channel.send_input(text)?;
        Ok(())
    }

    /// Record a new size and re-announce it when connected. The size is
    /// kept for the next open either way.
    pub fn resize(&mut self, size: TerminalSize) -> Result<(), CoreError> {
        if self.size == size {
            return Ok(());
        }
        self.size = size;
        match &self.channel {
            Some(channel) => Ok(channel.resize(size)?),
            None => Err(CoreError::ChannelDisconnected),
        }
    }
}

impl Drop for TerminalBridge {
    fn drop(&mut self) {
        self.close();
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(TerminalStatus::Connecting.to_string(), "connecting");
        assert_eq!(TerminalStatus::Connected.to_string(), "connected");
        assert_eq!(TerminalStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(
            TerminalStatus::Error("refused".into()).to_string(),
            "error: refused"
        );
    }

    #[test]
    fn lifecycle_events_map_to_status() {
        assert_eq!(
            status_for(&TerminalEvent::Connected),
            Some(TerminalStatus::Connected)
        );
        assert_eq!(
            status_for(&TerminalEvent::Disconnected("server ended the session".into())),
            Some(TerminalStatus::Disconnected)
        );
        assert_eq!(status_for(&TerminalEvent::Output("$ ".into())), None);
    }

    #[test]
    fn send_before_open_is_dropped() {
        let cancel = CancellationToken::new();
        let base = Url::parse("http://127.0.0.1:9").expect("valid URL");
        let mut bridge =
            TerminalBridge::new(&base, TerminalSize::default(), &cancel).expect("valid bridge");

        assert_eq!(bridge.status(), TerminalStatus::Disconnected);
        assert!(matches!(
            bridge.send_keys("ls\r"),
            Err(CoreError::ChannelDisconnected)
        ));
        assert!(matches!(
            bridge.resize(TerminalSize::new(132, 43)),
            Err(CoreError::ChannelDisconnected)
        ));
        assert_eq!(bridge.size(), TerminalSize::new(132, 43));
    }

    #[tokio::test]
    async fn failed_connect_reports_error_status() {
        let cancel = CancellationToken::new();
        // Port 9 (discard) is closed on test hosts; the connect is refused.
        let base = Url::parse("http://127.0.0.1:9").expect("valid URL");
        let mut bridge =
            TerminalBridge::new(&base, TerminalSize::default(), &cancel).expect("valid bridge");
        let mut status = bridge.subscribe_status();

        bridge.open();
        assert_eq!(*status.borrow_and_update(), TerminalStatus::Connecting);

        let final_status = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                if status.changed().await.is_err() {
                    break TerminalStatus::Disconnected;
                }
                let current = status.borrow_and_update().clone();
                if current != TerminalStatus::Connecting {
                    break current;
                }
            }
        })
        .await
        .expect("status settles");

        assert!(matches!(final_status, TerminalStatus::Error(_)));
    }
}

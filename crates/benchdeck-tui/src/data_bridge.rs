//! Data bridge — connects the [`Panel`] and terminal streams to TUI actions.
//!
//! Runs as a background task: starts the panel's poll loops, then forwards
//! every view change, status line and terminal event as an [`Action`]
//! through the TUI's action channel. Shuts the panel down on cancellation.

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use benchdeck_core::{BenchBackend, Panel, TerminalStatus};

use crate::action::Action;

/// Terminal subscriptions, taken from the bridge before it is opened.
pub struct TerminalFeed {
    pub status: watch::Receiver<TerminalStatus>,
    pub output: broadcast::Receiver<String>,
}

async fn next_output(output: &mut Option<broadcast::Receiver<String>>) -> Option<Action> {
    let output = output.as_mut()?;
    loop {
        match output.recv().await {
            Ok(text) => return Some(Action::TerminalOutput(text)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "terminal output lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn next_status(status: &mut Option<watch::Receiver<TerminalStatus>>) -> Option<Action> {
    let status = status.as_mut()?;
    status.changed().await.ok()?;
    let status = status.borrow_and_update().clone();
    Some(Action::TerminalStatusChanged(status))
}

/// Run until `cancel` fires. Polling starts here and stops here.
pub async fn spawn_data_bridge<B: BenchBackend>(
    panel: Panel<B>,
    terminal: Option<TerminalFeed>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut view = panel.subscribe_view();
    let mut status = panel.subscribe_status();

    panel.start();

    // Push initial snapshots so the screen has data immediately.
    let _ = action_tx.send(Action::ViewUpdated(Box::new(view.borrow_and_update().clone())));
    let _ = action_tx.send(Action::StatusUpdated(status.borrow_and_update().clone()));

    let (mut term_status, mut term_output) = terminal.map(|f| (f.status, f.output)).unzip();
    if let Some(rx) = term_status.as_mut() {
        let current = rx.borrow_and_update().clone();
        let _ = action_tx.send(Action::TerminalStatusChanged(current));
    }

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = view.changed() => {
                let snapshot = view.borrow_and_update().clone();
                let _ = action_tx.send(Action::ViewUpdated(Box::new(snapshot)));
            }
            Ok(()) = status.changed() => {
                let line = status.borrow_and_update().clone();
                let _ = action_tx.send(Action::StatusUpdated(line));
            }
            Some(action) = next_status(&mut term_status) => {
                let _ = action_tx.send(action);
            }
            Some(action) = next_output(&mut term_output) => {
                let _ = action_tx.send(action);
            }
        }
    }

    panel.shutdown().await;
    debug!("data bridge shut down");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use benchdeck_core::{BenchClient, PanelConfig, StatusLine, TerminalBridge, TerminalSize};
    use pretty_assertions::assert_eq;

    use super::*;

    // Nothing listens on the discard port; polls fail fast.
    const DEAD_URL: &str = "http://127.0.0.1:9";

    fn offline_panel() -> Panel<BenchClient> {
        let config = PanelConfig::new(benchdeck_config::parse_url(DEAD_URL).expect("url"));
        let client = config.client().expect("client");
        Panel::new(client, config)
    }

    #[tokio::test]
    async fn forwards_initial_snapshots_and_status_lines() {
        let panel = offline_panel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(spawn_data_bridge(panel.clone(), None, tx, cancel.clone()));

        let first = rx.recv().await.expect("initial view");
        assert!(matches!(first, Action::ViewUpdated(_)));
        let second = rx.recv().await.expect("initial status");
        assert!(matches!(second, Action::StatusUpdated(ref line) if line.message == "Ready"));

        panel.report(StatusLine::error("boom"));
        let mut saw_status = false;
        for _ in 0..20 {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(Action::StatusUpdated(line))) if line.message == "boom" => {
                    saw_status = true;
                    break;
                }
                Ok(Some(_)) => {}
                _ => break,
            }
        }
        assert!(saw_status);

        cancel.cancel();
        task.await.expect("bridge task");
    }

    #[tokio::test]
    async fn forwards_terminal_status_before_open() {
        let panel = offline_panel();
        let base = benchdeck_config::parse_url(DEAD_URL).expect("url");
        let bridge = TerminalBridge::new(&base, TerminalSize::default(), &CancellationToken::new())
            .expect("bridge");
        let feed = TerminalFeed {
            status: bridge.subscribe_status(),
            output: bridge.subscribe_output(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(spawn_data_bridge(panel, Some(feed), tx, cancel.clone()));

        let mut statuses = Vec::new();
        for _ in 0..3 {
            if let Some(Action::TerminalStatusChanged(s)) = rx.recv().await {
                statuses.push(s);
            }
        }
        assert_eq!(statuses, vec![TerminalStatus::Disconnected]);

        cancel.cancel();
        task.await.expect("bridge task");
    }
}

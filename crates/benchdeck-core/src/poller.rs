// ── State poller ──
//
// Background loops that keep the panel view current. Each tick is a full
// overwrite, so a slow tick overlapping a write is harmless. Ticks run as
// their own tasks: a hung request neither delays later ticks nor holds up
// shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::BenchBackend;
use crate::panel::Panel;

/// Air pressure changes slowly; poll it less often than state.
pub const PRESSURE_INTERVAL: Duration = Duration::from_secs(2);

/// Poll full state every `poll_interval` until cancelled. The first tick
/// fires immediately. Failures are recorded in the view by `poll_once`.
pub(crate) async fn poll_task<B: BenchBackend>(panel: Panel<B>, cancel: CancellationToken) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("poll task cancelled before bench names loaded");
            return;
        }
        result = panel.load_names() => {
            if let Err(e) = result {
                debug!(error = %e, "bench names unavailable, using defaults");
            }
        }
    }

    let interval = panel.config().poll_interval;
    run_ticks(interval, &cancel, move || {
        let panel = panel.clone();
        async move {
            let _ = panel.poll_once().await;
        }
    })
    .await;
    debug!("poll task exiting");
}

pub(crate) async fn pressure_task<B: BenchBackend>(panel: Panel<B>, cancel: CancellationToken) {
    run_ticks(PRESSURE_INTERVAL, &cancel, move || {
        let panel = panel.clone();
        async move {
            panel.refresh_pressure().await;
        }
    })
    .await;
}

/// Spawn `tick()` every `period` until cancelled, then abort whatever is
/// still running.
async fn run_ticks<F, Fut>(period: Duration, cancel: &CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(_) = in_flight.join_next() => {}
            _ = interval.tick() => {
                in_flight.spawn(tick());
            }
        }
    }

    if !in_flight.is_empty() {
        debug!(pending = in_flight.len(), "aborting in-flight ticks");
    }
    in_flight.abort_all();
}

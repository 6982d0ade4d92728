// ── Panel context ──
//
// Owns everything a panel session shares: the backend, the last fetched
// state (inside the published view), the rail snapshot store and one hold
// machine per bench. Front-ends hold a cheap clone and observe the view
// and status line through watch channels.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use benchdeck_api::{DeviceState, PressureReading};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::BenchBackend;
use crate::board::{Connectivity, PanelView};
use crate::config::PanelConfig;
use crate::error::CoreError;
use crate::model::{BenchId, Rail};
use crate::poller;
use crate::pressure::PressureDisplay;
use crate::service::{self, CommitOutcome, HoldEffect, HoldMachine};
use crate::snapshot::{RailSnapshot, RailSnapshotStore};
use crate::status::StatusLine;

/// Proof that the operator explicitly confirmed a destructive action.
///
/// Front-ends construct it only after a confirmation prompt (or an
/// explicit `--yes`).
#[derive(Debug, Clone, Copy)]
pub struct Confirmed(());

impl Confirmed {
    pub fn by_operator() -> Self {
        Self(())
    }
}

/// Counts a service commit as running for as long as it is alive.
struct CommitInFlight<'a>(&'a AtomicUsize);

impl<'a> CommitInFlight<'a> {
    fn enter(epoch: &AtomicU64, in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        epoch.fetch_add(1, Ordering::SeqCst);
        Self(in_flight)
    }
}

impl Drop for CommitInFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The panel session. Cheaply cloneable via `Arc<PanelInner>`.
pub struct Panel<B: BenchBackend> {
    inner: Arc<PanelInner<B>>,
}

impl<B: BenchBackend> Clone for Panel<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PanelInner<B> {
    backend: B,
    config: PanelConfig,
    view: watch::Sender<PanelView>,
    status: watch::Sender<StatusLine>,
    snapshots: tokio::sync::Mutex<RailSnapshotStore>,
    holds: Mutex<BTreeMap<BenchId, HoldMachine>>,
    /// Bumped when a service commit starts.
    commit_epoch: AtomicU64,
    commits_in_flight: AtomicUsize,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: BenchBackend> Panel<B> {
    /// Create a panel. Does not start polling; call [`start`](Self::start).
    pub fn new(backend: B, config: PanelConfig) -> Self {
        let (view, _) = watch::channel(PanelView::new());
        let (status, _) = watch::channel(StatusLine::default());
        let holds = BenchId::ALL
            .into_iter()
            .map(|id| (id, HoldMachine::new()))
            .collect();

        Self {
            inner: Arc::new(PanelInner {
                backend,
                config,
                view,
                status,
                snapshots: tokio::sync::Mutex::new(RailSnapshotStore::new()),
                holds: Mutex::new(holds),
                commit_epoch: AtomicU64::new(0),
                commits_in_flight: AtomicUsize::new(0),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Current view snapshot.
    pub fn view(&self) -> PanelView {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<PanelView> {
        self.inner.view.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusLine> {
        self.inner.status.subscribe()
    }

    /// Publish a status line.
    pub fn report(&self, line: StatusLine) {
        self.inner.status.send_replace(line);
    }

    /// Last successfully fetched device state.
    pub fn last_state(&self) -> Option<DeviceState> {
        self.inner.view.borrow().state.clone()
    }

    /// Snapshot currently held for a bench.
    pub async fn snapshot(&self, bench: BenchId) -> Option<RailSnapshot> {
        self.inner.snapshots.lock().await.get(bench)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background poll tasks. Must run inside a Tokio runtime.
    pub fn start(&self) {
        let cancel = self.inner.cancel.child_token();
        let state = tokio::spawn(poller::poll_task(self.clone(), cancel.clone()));
        let pressure = tokio::spawn(poller::pressure_task(self.clone(), cancel));
        self.lock_tasks().extend([state, pressure]);
        info!(
            url = %self.inner.config.url,
            interval_ms = u64::try_from(self.inner.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "panel started"
        );
    }

    /// Stop every background task and wait for them.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.lock_tasks().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!("panel stopped");
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Fetch the full state and overwrite the view with it.
    ///
    /// Snapshots of benches the state reports out of service are dropped.
    /// Failure marks connectivity offline with the error text and is
    /// returned; it never stops the poll loop.
    pub async fn poll_once(&self) -> Result<DeviceState, CoreError> {
        let epoch = self.inner.commit_epoch.load(Ordering::SeqCst);
        match self.inner.backend.fetch_state().await {
            Ok(state) => {
                let published = state.clone();
                self.inner.view.send_modify(|view| {
                    if !view.connectivity.is_online() {
                        info!("bench controller online");
                    }
                    view.apply_state(published);
                    view.connectivity = Connectivity::Online {
                        last_ok: Utc::now(),
                    };
                });
                self.drop_stale_snapshots(&state, epoch).await;
                Ok(state)
            }
            Err(e) => {
                let error = e.to_string();
                self.inner.view.send_modify(|view| {
                    if !matches!(view.connectivity, Connectivity::Offline { .. }) {
                        warn!(%error, "state poll failed");
                    }
                    let last_ok = view.connectivity.last_ok();
                    view.connectivity = Connectivity::Offline { error, last_ok };
                });
                Err(e)
            }
        }
    }

    /// Service mode can end without an exit commit (all-off, another
    /// client, a controller restart). Forget those benches' snapshots,
    /// unless a service commit started since `epoch` or is still running:
    /// then `state` may predate it.
    async fn drop_stale_snapshots(&self, state: &DeviceState, epoch: u64) {
        let mut snapshots = self.inner.snapshots.lock().await;
        let quiet = self.inner.commits_in_flight.load(Ordering::SeqCst) == 0
            && self.inner.commit_epoch.load(Ordering::SeqCst) == epoch;
        if quiet {
            for bench in snapshots.discard_out_of_service(state) {
                info!(%bench, "service mode ended outside the panel, snapshot dropped");
            }
        }
    }

    /// Fetch the air pressure into the view. Failures show the placeholder.
    pub async fn refresh_pressure(&self) -> PressureDisplay {
        let result: Result<PressureReading, CoreError> = self.inner.backend.air_pressure().await;
        if let Err(e) = &result {
            debug!(error = %e, "pressure fetch failed");
        }
        let display = PressureDisplay::from_result(result);
        self.inner
            .view
            .send_modify(|view| view.pressure = display.clone());
        display
    }

    /// Fetch operator bench names into the view.
    pub async fn load_names(&self) -> Result<(), CoreError> {
        let names = self.inner.backend.bench_names().await?;
        self.inner.view.send_modify(|view| view.apply_names(&names));
        Ok(())
    }

    fn apply_state(&self, state: DeviceState) {
        self.inner.view.send_modify(|view| view.apply_state(state));
    }

    /// Best-effort refresh after a failed write.
    async fn refresh_after_failure(&self) {
        if let Err(e) = self.poll_once().await {
            debug!(error = %e, "refresh after failed write also failed");
        }
    }

    // ── Channel writes ───────────────────────────────────────────────

    /// Set one channel. The bound toggle is disabled while the call is in
    /// flight.
    pub async fn set_channel(&self, channel: &str, on: bool) -> Result<DeviceState, CoreError> {
        self.set_pending(channel, true);
        let result = self.inner.backend.set_channel(channel, on).await;
        self.set_pending(channel, false);

        match result {
            Ok(state) => {
                self.apply_state(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.report(StatusLine::failed(&format!("set {channel}"), &e));
                self.refresh_after_failure().await;
                Err(e)
            }
        }
    }

    pub async fn set_rail(&self, bench: BenchId, rail: Rail, on: bool) -> Result<DeviceState, CoreError> {
        self.set_channel(&bench.rail_channel(rail), on).await
    }

    /// Switch all three rails of a bench: on in power-up order, off in
    /// kill order. Refused while the bench is in service mode.
    pub async fn set_rails_master(&self, bench: BenchId, on: bool) -> Result<DeviceState, CoreError> {
        if self.inner.view.borrow().in_service(bench) {
            let e = CoreError::ValidationFailed {
                message: format!("{bench} is in service mode; rails master is locked"),
            };
            self.report(StatusLine::failed("rails master", &e));
            return Err(e);
        }

        let order = if on { Rail::POWER_UP } else { Rail::KILL };
        self.set_master_pending(bench, true);

        let mut result = Ok(DeviceState::default());
        for rail in order {
            result = self
                .inner
                .backend
                .set_channel(&bench.rail_channel(rail), on)
                .await;
            if result.is_err() {
                break;
            }
        }

        self.set_master_pending(bench, false);

        match result {
            Ok(state) => {
                self.apply_state(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.report(StatusLine::failed(&format!("{bench} rails"), &e));
                self.refresh_after_failure().await;
                Err(e)
            }
        }
    }

    /// Switch every rail and port off.
    pub async fn all_off(&self, _confirmed: Confirmed) -> Result<DeviceState, CoreError> {
        info!("all off requested");
        match self.inner.backend.all_off().await {
            Ok(state) => {
                self.apply_state(state.clone());
                let dropped = self.inner.snapshots.lock().await.clear();
                if dropped > 0 {
                    debug!(dropped, "all off discarded rail snapshots");
                }
                self.report(StatusLine::success("All rails and ports off"));
                Ok(state)
            }
            Err(e) => {
                self.report(StatusLine::failed("all off", &e));
                self.refresh_after_failure().await;
                Err(e)
            }
        }
    }

    fn set_pending(&self, channel: &str, pending: bool) {
        self.inner.view.send_modify(|view| {
            if let Some(toggle) = view.toggle_mut(channel) {
                toggle.pending = pending;
            }
        });
    }

    fn set_master_pending(&self, bench: BenchId, pending: bool) {
        self.inner.view.send_modify(|view| {
            if let Some(card) = view.bench_mut(bench) {
                card.master.pending = pending;
            }
        });
    }

    // ── Service mode ─────────────────────────────────────────────────

    /// Pointer or key down on a bench's service button.
    pub fn press_service(&self, bench: BenchId) {
        let effect = self.with_hold(bench, HoldMachine::press);
        if let Some(HoldEffect::ArmTimer { generation }) = effect {
            let panel = self.clone();
            let cancel = self.inner.cancel.child_token();
            let threshold = self.inner.config.hold_threshold;
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(threshold) => panel.hold_timer_fired(bench, generation).await,
                }
            });
        }
    }

    /// Pointer or key up. Before the threshold this cancels the hold.
    pub fn release_service(&self, bench: BenchId) {
        self.with_hold(bench, HoldMachine::release);
    }

    /// Pointer left the button. Same as release.
    pub fn leave_service(&self, bench: BenchId) {
        self.with_hold(bench, HoldMachine::leave);
    }

    async fn hold_timer_fired(&self, bench: BenchId, generation: u64) {
        let in_service = self.inner.view.borrow().in_service(bench);
        let effect = self.with_hold(bench, |m| m.timer_fired(generation, in_service));

        if let Some(HoldEffect::Commit { enable }) = effect {
            self.commit_service(bench, enable).await;
            self.with_hold(bench, |m| {
                m.commit_finished();
                None
            });
        }
    }

    fn with_hold(
        &self,
        bench: BenchId,
        f: impl FnOnce(&mut HoldMachine) -> Option<HoldEffect>,
    ) -> Option<HoldEffect> {
        let (effect, state) = {
            let mut holds = self
                .inner
                .holds
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let machine = holds.entry(bench).or_default();
            let effect = f(machine);
            (effect, machine.state())
        };
        self.inner.view.send_modify(|view| {
            if let Some(card) = view.bench_mut(bench) {
                card.hold = state;
            }
        });
        effect
    }

    /// Run a service commit and refresh state, whatever the outcome.
    ///
    /// The outcome is also published on the status line.
    pub async fn commit_service(&self, bench: BenchId, enable: bool) -> CommitOutcome {
        let result = match self.last_state() {
            Some(state) => Ok(state),
            None => self.poll_once().await,
        };

        let result = match result {
            Ok(last_state) => {
                let _in_flight =
                    CommitInFlight::enter(&self.inner.commit_epoch, &self.inner.commits_in_flight);
                service::commit_service(
                    &self.inner.backend,
                    &self.inner.snapshots,
                    bench,
                    enable,
                    &last_state,
                )
                .await
            }
            Err(e) => Err(e),
        };

        let outcome = result.unwrap_or_else(|e| CommitOutcome::Failed {
            bench,
            enable,
            error: e.to_string(),
        });

        if let Err(e) = self.poll_once().await {
            debug!(error = %e, "refresh after service commit failed");
        }
        self.report(StatusLine::from(&outcome));
        outcome
    }

    /// Flip service mode from the last-known flag (fetching once if no
    /// state has been seen yet).
    pub async fn toggle_service(&self, bench: BenchId) -> CommitOutcome {
        if self.last_state().is_none() {
            if let Err(e) = self.poll_once().await {
                let outcome = CommitOutcome::Failed {
                    bench,
                    enable: true,
                    error: e.to_string(),
                };
                self.report(StatusLine::from(&outcome));
                return outcome;
            }
        }
        let enable = !self.inner.view.borrow().in_service(bench);
        self.commit_service(bench, enable).await
    }
}

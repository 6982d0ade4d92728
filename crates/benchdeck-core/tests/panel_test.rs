#![allow(clippy::unwrap_used)]
// Panel behaviour against an in-memory backend, plus a few end-to-end
// checks through `BenchClient` and wiremock.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use benchdeck_core::{
    BenchBackend, BenchClient, BenchId, BenchNames, CommitOutcome, Confirmed, Connectivity,
    CoreError, DeviceState, HoldState, Panel, PanelConfig, PRESSURE_PLACEHOLDER, PressureReading,
    Rail, StatusLevel,
};

// ── Recording backend ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Fetch,
    Set(String, bool),
    Service(BenchId, bool),
    AllOff,
}

#[derive(Default)]
struct FakeBackend {
    state: Mutex<BTreeMap<String, bool>>,
    calls: Mutex<Vec<Call>>,
    fail_service: AtomicBool,
    /// Real-time delay before `fetch_state` answers.
    fetch_delay_ms: AtomicU64,
}

impl FakeBackend {
    fn with_state(pairs: &[(&str, bool)]) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for (k, v) in pairs {
                state.insert((*k).to_owned(), *v);
            }
        }
        backend
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn snapshot(&self) -> DeviceState {
        self.state
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that change hardware, in order.
    fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Fetch))
            .collect()
    }

    fn set(&self, channel: &str, on: bool) {
        self.state.lock().unwrap().insert(channel.to_owned(), on);
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl BenchBackend for FakeBackend {
    async fn fetch_state(&self) -> Result<DeviceState, CoreError> {
        self.record(Call::Fetch);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.snapshot())
    }

    async fn set_channel(&self, channel: &str, on: bool) -> Result<DeviceState, CoreError> {
        self.record(Call::Set(channel.to_owned(), on));
        self.state.lock().unwrap().insert(channel.to_owned(), on);
        Ok(self.snapshot())
    }

    async fn set_service_mode(&self, bench: BenchId, enable: bool) -> Result<DeviceState, CoreError> {
        self.record(Call::Service(bench, enable));
        if self.fail_service.load(Ordering::SeqCst) {
            return Err(CoreError::Request {
                status: 500,
                message: "HTTP 500: relay board not responding".into(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.insert(bench.vbus_channel(), enable);
        if enable {
            // The controller drops the rails when a bench goes into service.
            for rail in Rail::POWER_UP {
                state.insert(bench.rail_channel(rail), false);
            }
        }
        drop(state);
        Ok(self.snapshot())
    }

    async fn all_off(&self) -> Result<DeviceState, CoreError> {
        self.record(Call::AllOff);
        for value in self.state.lock().unwrap().values_mut() {
            *value = false;
        }
        Ok(self.snapshot())
    }

    async fn air_pressure(&self) -> Result<PressureReading, CoreError> {
        Ok(PressureReading {
            sensor_available: true,
            psi: 92.5,
            mode: None,
            max_psi: Some(120.0),
        })
    }

    async fn bench_names(&self) -> Result<BenchNames, CoreError> {
        Ok(BenchNames::default())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn bench(n: u8) -> BenchId {
    BenchId::new(n).unwrap()
}

fn config() -> PanelConfig {
    PanelConfig::new(Url::parse("http://127.0.0.1:8080").unwrap())
}

fn panel(backend: FakeBackend) -> Panel<FakeBackend> {
    Panel::new(backend, config())
}

/// Let spawned tasks run to their next real wait.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

// ── Service commit ──────────────────────────────────────────────────

#[tokio::test]
async fn test_service_round_trip_restores_rails_in_order() {
    let panel = panel(FakeBackend::with_state(&[
        ("bench1_5v", true),
        ("bench1_12v", true),
        ("bench1_hv", false),
    ]));
    panel.poll_once().await.unwrap();

    let outcome = panel.commit_service(bench(1), true).await;
    assert_eq!(outcome, CommitOutcome::Entered { bench: bench(1) });
    assert_eq!(
        panel.backend().calls()[1..].to_vec(),
        vec![Call::Service(bench(1), true), Call::Fetch]
    );
    assert!(panel.view().in_service(bench(1)));
    let snapshot = panel.snapshot(bench(1)).await.unwrap();
    assert_eq!((snapshot.v5, snapshot.v12, snapshot.hv), (true, true, false));

    panel.backend().clear_calls();
    let outcome = panel.commit_service(bench(1), false).await;
    assert_eq!(
        outcome,
        CommitOutcome::Exited {
            bench: bench(1),
            restored: true
        }
    );
    assert_eq!(
        panel.backend().calls(),
        vec![
            Call::Service(bench(1), false),
            Call::Set("bench1_5v".into(), true),
            Call::Set("bench1_12v".into(), true),
            Call::Set("bench1_hv".into(), false),
            Call::Fetch,
        ]
    );
    assert!(panel.snapshot(bench(1)).await.is_none());

    let view = panel.view();
    let b1 = view.bench(bench(1)).unwrap();
    assert!(!b1.service);
    assert!(b1.rail(Rail::V5).on && b1.rail(Rail::V12).on && !b1.rail(Rail::Hv).on);
}

#[tokio::test]
async fn test_failed_entry_discards_snapshot() {
    let backend = FakeBackend::with_state(&[("bench2_5v", true)]);
    backend.fail_service.store(true, Ordering::SeqCst);
    let panel = panel(backend);
    panel.poll_once().await.unwrap();

    let outcome = panel.commit_service(bench(2), true).await;
    assert!(outcome.is_failure(), "expected failure, got: {outcome:?}");
    assert!(panel.snapshot(bench(2)).await.is_none());

    let status = panel.subscribe_status().borrow().clone();
    assert_eq!(status.level, StatusLevel::Error);
    assert!(status.message.contains("relay board not responding"));
}

#[tokio::test]
async fn test_exit_without_snapshot_only_disables() {
    let panel = panel(FakeBackend::with_state(&[("port3_vcc_en", true)]));
    panel.poll_once().await.unwrap();
    panel.backend().clear_calls();

    let outcome = panel.commit_service(bench(3), false).await;
    assert_eq!(
        outcome,
        CommitOutcome::Exited {
            bench: bench(3),
            restored: false
        }
    );
    assert_eq!(panel.backend().writes(), vec![Call::Service(bench(3), false)]);
}

#[tokio::test]
async fn test_commit_without_prior_state_fetches_first() {
    let panel = panel(FakeBackend::with_state(&[("bench4_hv", true)]));

    panel.commit_service(bench(4), true).await;
    assert_eq!(panel.backend().calls()[0], Call::Fetch);
    assert!(panel.snapshot(bench(4)).await.unwrap().hv);
}

#[tokio::test]
async fn test_toggle_service_negates_last_known_flag() {
    let panel = panel(FakeBackend::with_state(&[("port2_vcc_en", true)]));
    panel.poll_once().await.unwrap();

    panel.toggle_service(bench(2)).await;
    assert_eq!(panel.backend().writes(), vec![Call::Service(bench(2), false)]);
}

// ── Hold-to-toggle ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_tap_below_threshold_issues_no_call() {
    let panel = panel(FakeBackend::default());
    panel.poll_once().await.unwrap();

    panel.press_service(bench(1));
    settle().await;
    tokio::time::advance(Duration::from_millis(1000)).await;
    panel.release_service(bench(1));
    assert_eq!(panel.view().bench(bench(1)).unwrap().hold, HoldState::Idle);

    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(panel.backend().writes(), vec![]);
}

#[tokio::test(start_paused = true)]
async fn test_pointer_leave_cancels_hold() {
    let panel = panel(FakeBackend::default());
    panel.poll_once().await.unwrap();

    panel.press_service(bench(2));
    settle().await;
    tokio::time::advance(Duration::from_millis(700)).await;
    panel.leave_service(bench(2));

    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(panel.backend().writes(), vec![]);
}

#[tokio::test(start_paused = true)]
async fn test_hold_past_threshold_commits_once() {
    let panel = panel(FakeBackend::with_state(&[("bench1_5v", true)]));
    panel.poll_once().await.unwrap();

    panel.press_service(bench(1));
    settle().await;
    assert!(matches!(
        panel.view().bench(bench(1)).unwrap().hold,
        HoldState::Holding { .. }
    ));

    tokio::time::advance(Duration::from_millis(1600)).await;
    settle().await;
    // Releasing after the commit started changes nothing.
    panel.release_service(bench(1));
    settle().await;

    assert_eq!(panel.backend().writes(), vec![Call::Service(bench(1), true)]);
    assert_eq!(panel.view().bench(bench(1)).unwrap().hold, HoldState::Idle);
    assert!(panel.view().in_service(bench(1)));

    // A second hold leaves service mode and restores the 5V rail.
    panel.backend().clear_calls();
    panel.press_service(bench(1));
    settle().await;
    tokio::time::advance(Duration::from_millis(1600)).await;
    settle().await;
    assert_eq!(
        panel.backend().writes(),
        vec![
            Call::Service(bench(1), false),
            Call::Set("bench1_5v".into(), true),
            Call::Set("bench1_12v".into(), false),
            Call::Set("bench1_hv".into(), false),
        ]
    );
}

// ── Rails master and all-off ────────────────────────────────────────

#[tokio::test]
async fn test_rails_master_powers_up_and_kills_in_order() {
    let panel = panel(FakeBackend::default());
    panel.poll_once().await.unwrap();

    panel.set_rails_master(bench(2), true).await.unwrap();
    assert!(panel.view().bench(bench(2)).unwrap().master.on);

    panel.set_rails_master(bench(2), false).await.unwrap();
    assert_eq!(
        panel.backend().writes(),
        vec![
            Call::Set("bench2_5v".into(), true),
            Call::Set("bench2_12v".into(), true),
            Call::Set("bench2_hv".into(), true),
            Call::Set("bench2_hv".into(), false),
            Call::Set("bench2_12v".into(), false),
            Call::Set("bench2_5v".into(), false),
        ]
    );
    assert!(!panel.view().bench(bench(2)).unwrap().master.on);
}

#[tokio::test]
async fn test_rails_master_locked_in_service() {
    let panel = panel(FakeBackend::with_state(&[("port4_vcc_en", true)]));
    panel.poll_once().await.unwrap();

    let card = panel.view().bench(bench(4)).unwrap().clone();
    assert!(card.master.locked);
    assert!(!card.master.on);

    let result = panel.set_rails_master(bench(4), true).await;
    assert!(matches!(result, Err(CoreError::ValidationFailed { .. })));
    assert_eq!(panel.backend().writes(), vec![]);
}

#[tokio::test]
async fn test_all_off_with_confirmation() {
    let panel = panel(FakeBackend::with_state(&[
        ("bench1_5v", true),
        ("lights", true),
    ]));
    panel.poll_once().await.unwrap();

    panel.all_off(Confirmed::by_operator()).await.unwrap();
    assert_eq!(panel.backend().writes(), vec![Call::AllOff]);
    assert!(!panel.view().bench(bench(1)).unwrap().rail(Rail::V5).on);
    assert_eq!(
        panel.subscribe_status().borrow().level,
        StatusLevel::Success
    );
}

#[tokio::test]
async fn test_all_off_forgets_service_snapshot() {
    let panel = panel(FakeBackend::with_state(&[
        ("bench1_5v", true),
        ("bench1_12v", true),
        ("bench1_hv", true),
    ]));
    panel.poll_once().await.unwrap();
    panel.commit_service(bench(1), true).await;
    assert!(panel.snapshot(bench(1)).await.is_some());

    panel.all_off(Confirmed::by_operator()).await.unwrap();
    assert!(panel.snapshot(bench(1)).await.is_none());

    // A later service cycle restores what was on after the all-off.
    panel.commit_service(bench(1), true).await;
    panel.backend().clear_calls();
    let outcome = panel.commit_service(bench(1), false).await;
    assert_eq!(
        outcome,
        CommitOutcome::Exited {
            bench: bench(1),
            restored: true
        }
    );
    assert_eq!(
        panel.backend().writes(),
        vec![
            Call::Service(bench(1), false),
            Call::Set("bench1_5v".into(), false),
            Call::Set("bench1_12v".into(), false),
            Call::Set("bench1_hv".into(), false),
        ]
    );
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hung_poll_neither_blocks_ticks_nor_shutdown() {
    let backend = FakeBackend::default();
    backend.fetch_delay_ms.store(30_000, Ordering::SeqCst);
    let mut config = config();
    config.poll_interval = Duration::from_millis(50);
    let panel = Panel::new(backend, config);

    panel.start();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let fetches = panel
        .backend()
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Fetch))
        .count();
    assert!(fetches >= 3, "only {fetches} polls started");

    tokio::time::timeout(Duration::from_secs(1), panel.shutdown())
        .await
        .expect("shutdown waited on a hung poll");
}

#[tokio::test]
async fn test_service_exit_elsewhere_drops_snapshot_on_next_poll() {
    let panel = panel(FakeBackend::with_state(&[
        ("bench2_5v", true),
        ("bench2_hv", true),
    ]));
    panel.poll_once().await.unwrap();
    panel.commit_service(bench(2), true).await;

    panel.poll_once().await.unwrap();
    assert!(panel.snapshot(bench(2)).await.is_some(), "still in service");

    panel.backend().set("port2_vcc_en", false);
    panel.poll_once().await.unwrap();
    assert!(panel.snapshot(bench(2)).await.is_none());

    // Re-entering captures the current rails rather than the old ones.
    panel.commit_service(bench(2), true).await;
    let snapshot = panel.snapshot(bench(2)).await.unwrap();
    assert_eq!((snapshot.v5, snapshot.v12, snapshot.hv), (false, false, false));
}

// ── Through BenchClient ─────────────────────────────────────────────

async fn client_panel(server: &MockServer, poll_interval: Duration) -> Panel<BenchClient> {
    let mut config = PanelConfig::new(Url::parse(&server.uri()).unwrap());
    config.poll_interval = poll_interval;
    let client = BenchClient::with_client(reqwest::Client::new(), config.url.clone());
    Panel::new(client, config)
}

#[tokio::test]
async fn test_poll_failure_goes_offline_and_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/state"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/state"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": { "lights": true } })),
        )
        .mount(&server)
        .await;

    let panel = client_panel(&server, Duration::from_millis(50)).await;
    let mut view = panel.subscribe_view();
    panel.start();

    let offline_error = tokio::time::timeout(Duration::from_secs(5), async {
        let mut offline_error = None;
        loop {
            view.changed().await.unwrap();
            match &view.borrow_and_update().connectivity {
                Connectivity::Offline { error, .. } => offline_error = Some(error.clone()),
                Connectivity::Online { .. } => break offline_error,
                Connectivity::Unknown => {}
            }
        }
    })
    .await
    .unwrap();

    let error = offline_error.expect("first poll should have marked the panel offline");
    assert!(error.contains("500"), "error was {error:?}");
    assert!(error.contains("boom"), "error was {error:?}");
    assert!(panel.view().facility[0].1.on);
    panel.shutdown().await;
}

#[tokio::test]
async fn test_non_numeric_pressure_shows_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/air_pressure"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "psi": "abc" })),
        )
        .mount(&server)
        .await;

    let panel = client_panel(&server, Duration::from_secs(1)).await;
    let display = panel.refresh_pressure().await;

    assert_eq!(display.to_string(), PRESSURE_PLACEHOLDER);
    assert_eq!(panel.view().pressure.to_string(), PRESSURE_PLACEHOLDER);
}

//! Hold-to-toggle service mode.
//!
//! Each bench owns a [`HoldMachine`]. Input events (press, release, pointer
//! leave, timer fire, commit finished) go through the pure [`transition`]
//! function, which returns the next [`HoldState`] and at most one
//! [`HoldEffect`] for the host to carry out. The host owns the timer: it
//! arms one per [`HoldEffect::ArmTimer`] and reports it back with the same
//! generation. A timer from an abandoned hold carries a stale generation
//! and is ignored, which is what makes cancellation side-effect free.
//!
//! The commit itself is [`commit_service`]: capture, enable, (discard on
//! failure) for entry; disable, restore for exit.

use std::fmt;

use benchdeck_api::DeviceState;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::BenchBackend;
use crate::error::CoreError;
use crate::model::BenchId;
use crate::snapshot::RailSnapshotStore;

// ── State machine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldState {
    /// No hold in progress.
    #[default]
    Idle,
    /// Pressed, waiting for the hold threshold.
    Holding { generation: u64 },
    /// Threshold reached outside service mode; entry commit in flight.
    Activating,
    /// Threshold reached in service mode; exit commit in flight.
    Deactivating,
}

impl HoldState {
    /// Whether a commit is in flight.
    pub fn is_committing(self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldInput {
    Press { generation: u64 },
    Release,
    Leave,
    TimerFired { generation: u64 },
    CommitFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldEffect {
    /// Start a single-shot timer of one hold threshold.
    ArmTimer { generation: u64 },
    /// Run the service commit with this `enable` value.
    Commit { enable: bool },
}

/// Next state for `input`.
///
/// `in_service` is the bench's last-known service flag; it is only read
/// when the timer fires.
pub fn transition(
    state: HoldState,
    input: HoldInput,
    in_service: bool,
) -> (HoldState, Option<HoldEffect>) {
    match (state, input) {
        (HoldState::Idle, HoldInput::Press { generation }) => (
            HoldState::Holding { generation },
            Some(HoldEffect::ArmTimer { generation }),
        ),
        (HoldState::Holding { .. }, HoldInput::Release | HoldInput::Leave) => (HoldState::Idle, None),
        (HoldState::Holding { generation }, HoldInput::TimerFired { generation: fired })
            if generation == fired =>
        {
            if in_service {
                (
                    HoldState::Deactivating,
                    Some(HoldEffect::Commit { enable: false }),
                )
            } else {
                (
                    HoldState::Activating,
                    Some(HoldEffect::Commit { enable: true }),
                )
            }
        }
        (HoldState::Activating | HoldState::Deactivating, HoldInput::CommitFinished) => {
            (HoldState::Idle, None)
        }
        // Stale timers, presses during a commit, releases when idle.
        (state, _) => (state, None),
    }
}

/// Per-bench hold tracker that hands out timer generations.
#[derive(Debug, Default)]
pub struct HoldMachine {
    state: HoldState,
    generation: u64,
}

impl HoldMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    pub fn press(&mut self) -> Option<HoldEffect> {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.apply(HoldInput::Press { generation }, false)
    }

    pub fn release(&mut self) -> Option<HoldEffect> {
        self.apply(HoldInput::Release, false)
    }

    pub fn leave(&mut self) -> Option<HoldEffect> {
        self.apply(HoldInput::Leave, false)
    }

    pub fn timer_fired(&mut self, generation: u64, in_service: bool) -> Option<HoldEffect> {
        self.apply(HoldInput::TimerFired { generation }, in_service)
    }

    pub fn commit_finished(&mut self) {
        self.apply(HoldInput::CommitFinished, false);
    }

    fn apply(&mut self, input: HoldInput, in_service: bool) -> Option<HoldEffect> {
        let (next, effect) = transition(self.state, input, in_service);
        self.state = next;
        effect
    }
}

// ── Commit ───────────────────────────────────────────────────────────

/// Result of one service commit, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Entered { bench: BenchId },
    Exited { bench: BenchId, restored: bool },
    Failed {
        bench: BenchId,
        enable: bool,
        error: String,
    },
}

impl CommitOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entered { bench } => write!(f, "{bench}: service mode on"),
            Self::Exited {
                bench,
                restored: true,
            } => write!(f, "{bench}: service mode off, rails restored"),
            Self::Exited {
                bench,
                restored: false,
            } => write!(f, "{bench}: service mode off (no rail snapshot)"),
            Self::Failed {
                bench,
                enable,
                error,
            } => {
                let verb = if *enable { "enter" } else { "leave" };
                write!(f, "{bench}: failed to {verb} service mode: {error}")
            }
        }
    }
}

/// Enter or leave service mode for one bench.
///
/// Entry: snapshot the rails from `last_state` (first capture wins), then
/// enable. A failed enable discards the snapshot it just made room for.
///
/// Exit: disable, then replay the snapshot 5V, 12V, HV.
///
/// The caller refreshes state afterwards in both cases.
pub async fn commit_service<B: BenchBackend>(
    backend: &B,
    snapshots: &Mutex<RailSnapshotStore>,
    bench: BenchId,
    enable: bool,
    last_state: &DeviceState,
) -> Result<CommitOutcome, CoreError> {
    if enable {
        let captured = snapshots.lock().await.capture_if_absent(bench, last_state);
        if let Err(e) = backend.set_service_mode(bench, true).await {
            if captured {
                snapshots.lock().await.discard(bench);
            }
            warn!(%bench, error = %e, "service mode entry failed");
            return Err(e);
        }
        info!(%bench, "service mode entered");
        Ok(CommitOutcome::Entered { bench })
    } else {
        backend.set_service_mode(bench, false).await.inspect_err(|e| {
            warn!(%bench, error = %e, "service mode exit failed");
        })?;
        let restored = snapshots
            .lock()
            .await
            .consume_and_restore(bench, |channel, on| async move {
                backend.set_channel(&channel, on).await
            })
            .await?;
        info!(%bench, restored, "service mode left");
        Ok(CommitOutcome::Exited { bench, restored })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_arms_timer() {
        let (next, effect) = transition(HoldState::Idle, HoldInput::Press { generation: 7 }, false);
        assert_eq!(next, HoldState::Holding { generation: 7 });
        assert_eq!(effect, Some(HoldEffect::ArmTimer { generation: 7 }));
    }

    #[test]
    fn release_or_leave_before_threshold_cancels() {
        for input in [HoldInput::Release, HoldInput::Leave] {
            let (next, effect) = transition(HoldState::Holding { generation: 1 }, input, false);
            assert_eq!(next, HoldState::Idle);
            assert_eq!(effect, None);
        }
    }

    #[test]
    fn timer_commits_negation_of_service_flag() {
        let held = HoldState::Holding { generation: 3 };
        assert_eq!(
            transition(held, HoldInput::TimerFired { generation: 3 }, false),
            (HoldState::Activating, Some(HoldEffect::Commit { enable: true }))
        );
        assert_eq!(
            transition(held, HoldInput::TimerFired { generation: 3 }, true),
            (HoldState::Deactivating, Some(HoldEffect::Commit { enable: false }))
        );
    }

    #[test]
    fn stale_timer_is_ignored() {
        let held = HoldState::Holding { generation: 4 };
        assert_eq!(
            transition(held, HoldInput::TimerFired { generation: 3 }, false),
            (held, None)
        );
        assert_eq!(
            transition(HoldState::Idle, HoldInput::TimerFired { generation: 4 }, false),
            (HoldState::Idle, None)
        );
    }

    #[test]
    fn commit_in_flight_ignores_new_presses() {
        let (next, effect) = transition(
            HoldState::Activating,
            HoldInput::Press { generation: 9 },
            false,
        );
        assert_eq!(next, HoldState::Activating);
        assert_eq!(effect, None);

        let (next, _) = transition(HoldState::Deactivating, HoldInput::CommitFinished, true);
        assert_eq!(next, HoldState::Idle);
    }

    #[test]
    fn tap_never_commits() {
        let mut machine = HoldMachine::new();
        let Some(HoldEffect::ArmTimer { generation }) = machine.press() else {
            panic!("press should arm a timer");
        };
        assert_eq!(machine.release(), None);
        assert_eq!(machine.timer_fired(generation, false), None);
        assert_eq!(machine.state(), HoldState::Idle);
    }

    #[test]
    fn second_press_gets_fresh_generation() {
        let mut machine = HoldMachine::new();
        let first = machine.press();
        machine.leave();
        let second = machine.press();
        assert_ne!(first, second);

        let Some(HoldEffect::ArmTimer { generation: old }) = first else {
            panic!("first press should arm a timer");
        };
        assert_eq!(machine.timer_fired(old, false), None);
        assert!(matches!(machine.state(), HoldState::Holding { .. }));
    }

    #[test]
    fn outcome_messages() {
        let bench = BenchId::new(1).expect("valid bench");
        assert_eq!(
            CommitOutcome::Entered { bench }.to_string(),
            "bench1: service mode on"
        );
        let failed = CommitOutcome::Failed {
            bench,
            enable: true,
            error: "HTTP 500: boom".into(),
        };
        assert!(failed.is_failure());
        assert_eq!(
            failed.to_string(),
            "bench1: failed to enter service mode: HTTP 500: boom"
        );
    }
}

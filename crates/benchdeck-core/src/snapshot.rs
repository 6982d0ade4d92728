// ── Rail snapshot store ──
//
// Per-bench record of the three rail values taken when service mode is
// entered, replayed when it is left. Capture once, consume once.

use std::collections::BTreeMap;
use std::future::Future;

use benchdeck_api::DeviceState;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{BenchId, Rail};

/// The three rail values of one bench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RailSnapshot {
    pub v5: bool,
    pub v12: bool,
    pub hv: bool,
}

impl RailSnapshot {
    /// Read a bench's rails out of a device state.
    pub fn from_state(bench: BenchId, state: &DeviceState) -> Self {
        Self {
            v5: state.get(&bench.rail_channel(Rail::V5)),
            v12: state.get(&bench.rail_channel(Rail::V12)),
            hv: state.get(&bench.rail_channel(Rail::Hv)),
        }
    }

    pub fn get(&self, rail: Rail) -> bool {
        match rail {
            Rail::V5 => self.v5,
            Rail::V12 => self.v12,
            Rail::Hv => self.hv,
        }
    }
}

/// Snapshots keyed by bench. Lives in the panel context for the life of
/// the session; nothing is persisted.
#[derive(Debug, Default)]
pub struct RailSnapshotStore {
    entries: BTreeMap<BenchId, RailSnapshot>,
}

impl RailSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the bench's rails from `state` unless a snapshot already
    /// exists. Returns `true` when a snapshot was taken.
    pub fn capture_if_absent(&mut self, bench: BenchId, state: &DeviceState) -> bool {
        if self.entries.contains_key(&bench) {
            debug!(%bench, "snapshot already held, keeping the first capture");
            return false;
        }
        let snapshot = RailSnapshot::from_state(bench, state);
        debug!(%bench, ?snapshot, "captured rail snapshot");
        self.entries.insert(bench, snapshot);
        true
    }

    pub fn get(&self, bench: BenchId) -> Option<RailSnapshot> {
        self.entries.get(&bench).copied()
    }

    pub fn contains(&self, bench: BenchId) -> bool {
        self.entries.contains_key(&bench)
    }

    /// Drop a bench's snapshot without replaying it.
    pub fn discard(&mut self, bench: BenchId) -> Option<RailSnapshot> {
        self.entries.remove(&bench)
    }

    /// Drop every snapshot. Returns how many were held.
    pub fn clear(&mut self) -> usize {
        let held = self.entries.len();
        self.entries.clear();
        held
    }

    /// Drop the snapshots of benches `state` reports out of service mode.
    /// Returns the benches whose snapshot was dropped.
    pub fn discard_out_of_service(&mut self, state: &DeviceState) -> Vec<BenchId> {
        let stale: Vec<BenchId> = self
            .entries
            .keys()
            .copied()
            .filter(|bench| !state.get(&bench.vbus_channel()))
            .collect();
        for bench in &stale {
            self.entries.remove(bench);
        }
        stale
    }

    /// Replay the bench's snapshot through `set_channel` in the order 5V,
    /// 12V, HV, then forget it. No-op when no snapshot exists.
    ///
    /// The entry is removed before the first call, so a replay that fails
    /// part-way still leaves no snapshot behind. Returns whether a replay
    /// happened.
    pub async fn consume_and_restore<F, Fut>(
        &mut self,
        bench: BenchId,
        mut set_channel: F,
    ) -> Result<bool, CoreError>
    where
        F: FnMut(String, bool) -> Fut,
        Fut: Future<Output = Result<DeviceState, CoreError>>,
    {
        let Some(snapshot) = self.entries.remove(&bench) else {
            debug!(%bench, "no snapshot to restore");
            return Ok(false);
        };

        for rail in Rail::POWER_UP {
            let on = snapshot.get(rail);
            debug!(%bench, %rail, on, "restoring rail");
            set_channel(bench.rail_channel(rail), on).await?;
        }
        Ok(true)
    }
}

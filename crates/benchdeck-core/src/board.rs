// ── Toggle board ──
//
// The UI-facing view of the panel: one card per bench plus the facility
// switches. Rebuilt from each fetched `DeviceState` by overwrite, never
// by merge. Toggles that are disabled (request in flight, or locked by
// service mode) are left alone so a poll cannot clobber them.

use benchdeck_api::{BenchNames, DeviceState};
use chrono::{DateTime, Utc};

use crate::model::{BenchId, Rail};
use crate::pressure::PressureDisplay;
use crate::service::HoldState;

/// Facility switches shown under the bench cards.
pub const FACILITY_CHANNELS: [&str; 2] = ["lights", "air_compressor"];

/// One on/off control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toggle {
    pub on: bool,
    /// A write for this control is in flight.
    pub pending: bool,
    /// Forced by another control (rails master during service mode).
    pub locked: bool,
}

impl Toggle {
    pub fn is_disabled(self) -> bool {
        self.pending || self.locked
    }
}

/// One bench card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchView {
    pub id: BenchId,
    /// Operator-assigned name; may be blank.
    pub name: String,
    /// Rails in power-up order: 5V, 12V, HV.
    pub rails: [Toggle; 3],
    pub master: Toggle,
    /// Derived from the bench's VBUS channel.
    pub service: bool,
    pub hold: HoldState,
}

impl BenchView {
    fn new(id: BenchId) -> Self {
        Self {
            id,
            name: String::new(),
            rails: [Toggle::default(); 3],
            master: Toggle::default(),
            service: false,
            hold: HoldState::Idle,
        }
    }

    /// Display label; a blank name shows as `Bench N`.
    pub fn label(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.id.default_label()
        } else {
            name.to_owned()
        }
    }

    pub fn rail(&self, rail: Rail) -> Toggle {
        self.rails[rail_index(rail)]
    }

    pub fn rail_mut(&mut self, rail: Rail) -> &mut Toggle {
        &mut self.rails[rail_index(rail)]
    }

    /// Master reads "on" iff every rail is on.
    pub fn all_rails_on(&self) -> bool {
        self.rails.iter().all(|t| t.on)
    }
}

fn rail_index(rail: Rail) -> usize {
    match rail {
        Rail::V5 => 0,
        Rail::V12 => 1,
        Rail::Hv => 2,
    }
}

/// Backend reachability as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// No poll has completed yet.
    #[default]
    Unknown,
    Online { last_ok: DateTime<Utc> },
    Offline {
        error: String,
        last_ok: Option<DateTime<Utc>>,
    },
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }

    pub fn last_ok(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Online { last_ok } => Some(*last_ok),
            Self::Offline { last_ok, .. } => *last_ok,
            Self::Unknown => None,
        }
    }

    /// `Online` / `Offline` / `Connecting`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Connecting",
            Self::Online { .. } => "Online",
            Self::Offline { .. } => "Offline",
        }
    }
}

/// Everything a panel front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub benches: Vec<BenchView>,
    pub facility: Vec<(String, Toggle)>,
    pub connectivity: Connectivity,
    pub pressure: PressureDisplay,
    /// Last successfully fetched state.
    pub state: Option<DeviceState>,
}

impl Default for PanelView {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelView {
    pub fn new() -> Self {
        Self {
            benches: BenchId::ALL.into_iter().map(BenchView::new).collect(),
            facility: FACILITY_CHANNELS
                .iter()
                .map(|name| ((*name).to_owned(), Toggle::default()))
                .collect(),
            connectivity: Connectivity::Unknown,
            pressure: PressureDisplay::Unknown,
            state: None,
        }
    }

    pub fn bench(&self, id: BenchId) -> Option<&BenchView> {
        self.benches.iter().find(|b| b.id == id)
    }

    pub fn bench_mut(&mut self, id: BenchId) -> Option<&mut BenchView> {
        self.benches.iter_mut().find(|b| b.id == id)
    }

    /// Last-known service flag of a bench.
    pub fn in_service(&self, id: BenchId) -> bool {
        self.bench(id).is_some_and(|b| b.service)
    }

    /// Overwrite every enabled toggle from `state`, recompute service
    /// flags, then derive the rails masters.
    pub fn apply_state(&mut self, state: DeviceState) {
        for bench in &mut self.benches {
            let id = bench.id;
            for rail in Rail::POWER_UP {
                let toggle = bench.rail_mut(rail);
                if !toggle.is_disabled() {
                    toggle.on = state.get(&id.rail_channel(rail));
                }
            }

            bench.service = state.get(&id.vbus_channel());

            if bench.service {
                bench.master.on = false;
                bench.master.locked = true;
            } else {
                bench.master.locked = false;
                if !bench.master.pending {
                    bench.master.on = bench.all_rails_on();
                }
            }
        }

        for (name, toggle) in &mut self.facility {
            if !toggle.is_disabled() {
                toggle.on = state.get(name);
            }
        }

        self.state = Some(state);
    }

    pub fn apply_names(&mut self, names: &BenchNames) {
        for bench in &mut self.benches {
            if let Some(name) = names.get(bench.id.number()) {
                name.clone_into(&mut bench.name);
            }
        }
    }

    /// The toggle bound to a channel, if the board shows it.
    pub fn toggle_mut(&mut self, channel: &str) -> Option<&mut Toggle> {
        for bench in &mut self.benches {
            let id = bench.id;
            if let Some(rail) = Rail::POWER_UP
                .into_iter()
                .find(|r| id.rail_channel(*r) == channel)
            {
                return Some(bench.rail_mut(rail));
            }
        }
        self.facility
            .iter_mut()
            .find(|(name, _)| name == channel)
            .map(|(_, toggle)| toggle)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bench(n: u8) -> BenchId {
        BenchId::new(n).expect("valid bench")
    }

    fn state(pairs: &[(&str, bool)]) -> DeviceState {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn apply_state_overwrites_every_enabled_toggle() {
        let mut view = PanelView::new();
        view.apply_state(state(&[
            ("bench1_5v", true),
            ("bench1_12v", true),
            ("bench1_hv", true),
            ("lights", true),
        ]));
        view.apply_state(state(&[("bench1_12v", true)]));

        let b1 = view.bench(bench(1)).expect("bench 1");
        assert_eq!(
            [b1.rail(Rail::V5).on, b1.rail(Rail::V12).on, b1.rail(Rail::Hv).on],
            [false, true, false]
        );
        assert!(!b1.master.on);
        assert!(!view.facility[0].1.on);
    }

    #[test]
    fn pending_toggle_is_not_clobbered() {
        let mut view = PanelView::new();
        let toggle = view.toggle_mut("bench2_hv").expect("rail toggle");
        toggle.on = true;
        toggle.pending = true;

        view.apply_state(state(&[("bench2_hv", false)]));
        assert!(view.bench(bench(2)).expect("bench 2").rail(Rail::Hv).on);
    }

    #[test]
    fn master_is_forced_off_and_locked_in_service() {
        let mut view = PanelView::new();
        view.apply_state(state(&[
            ("bench3_5v", true),
            ("bench3_12v", true),
            ("bench3_hv", true),
        ]));
        assert!(view.bench(bench(3)).expect("bench 3").master.on);

        view.apply_state(state(&[
            ("bench3_5v", true),
            ("bench3_12v", true),
            ("bench3_hv", true),
            ("port3_vcc_en", true),
        ]));
        let b3 = view.bench(bench(3)).expect("bench 3");
        assert!(b3.service);
        assert!(!b3.master.on);
        assert!(b3.master.is_disabled());

        view.apply_state(state(&[("port3_vcc_en", false)]));
        let b3 = view.bench(bench(3)).expect("bench 3");
        assert!(!b3.service);
        assert!(!b3.master.is_disabled());
    }

    #[test]
    fn blank_names_fall_back_to_bench_number() {
        let mut view = PanelView::new();
        let names = BenchNames {
            b1: "RF rework".into(),
            b2: "   ".into(),
            ..BenchNames::default()
        };
        view.apply_names(&names);
        assert_eq!(view.bench(bench(1)).expect("bench 1").label(), "RF rework");
        assert_eq!(view.bench(bench(2)).expect("bench 2").label(), "Bench 2");
    }

    #[test]
    fn connectivity_labels() {
        assert_eq!(Connectivity::Unknown.label(), "Connecting");
        let offline = Connectivity::Offline {
            error: "HTTP 500".into(),
            last_ok: None,
        };
        assert_eq!(offline.label(), "Offline");
        assert!(!offline.is_online());
    }
}

//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::fmt;

use benchdeck_core::{BenchId, PanelView, Rail, StatusLine, TerminalStatus};

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Panel,
    Terminal,
}

/// Destructive operations that go through the confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    AllOff,
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllOff => f.write_str("Switch off every rail and port on all benches?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation / overlays ──
    FocusNext,
    ToggleHelp,

    // ── Data from the bridge ──
    ViewUpdated(Box<PanelView>),
    StatusUpdated(StatusLine),
    TerminalStatusChanged(TerminalStatus),
    TerminalOutput(String),

    // ── Panel commands ──
    SetRail { bench: BenchId, rail: Rail, on: bool },
    SetRailsMaster { bench: BenchId, on: bool },
    SetFacility { channel: String, on: bool },
    ServicePress(BenchId),
    ServiceRelease(BenchId),
    ServiceLeave(BenchId),
    RefreshNow,

    // ── Confirmation ──
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,

    // ── Terminal ──
    TerminalInput(String),
    TerminalReconnect,
}

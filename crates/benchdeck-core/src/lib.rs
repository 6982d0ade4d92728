//! Panel logic between `benchdeck-api` and the front-ends (CLI / TUI).
//!
//! This crate owns everything that is not HTTP plumbing or drawing:
//!
//! - **[`Panel`]**: the session context. Holds the backend, publishes a
//!   [`PanelView`] and a [`StatusLine`] over watch channels, runs the state
//!   and pressure pollers, and carries out channel writes, the rails
//!   master and all-off.
//!
//! - **Service mode** ([`service`]): the hold-to-toggle [`HoldMachine`] per
//!   bench and the entry/exit commit, which snapshots rails on entry and
//!   replays them 5V, 12V, HV on exit via the [`RailSnapshotStore`].
//!
//! - **[`BenchBackend`]**: the seam the panel issues remote calls through.
//!   [`BenchClient`] implements it; tests use an in-memory backend.
//!
//! - **[`TerminalBridge`]**: passthrough between a terminal widget and the
//!   controller's terminal channel.
//!
//! - **Domain model** ([`model`]): [`BenchId`], [`Rail`] and the channel
//!   catalogue.

pub mod backend;
pub mod board;
pub mod config;
pub mod error;
pub mod model;
pub mod panel;
mod poller;
pub mod pressure;
pub mod service;
pub mod snapshot;
pub mod status;
pub mod terminal;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::BenchBackend;
pub use board::{BenchView, Connectivity, FACILITY_CHANNELS, PanelView, Toggle};
pub use config::PanelConfig;
pub use error::CoreError;
pub use panel::{Confirmed, Panel};
pub use poller::PRESSURE_INTERVAL;
pub use pressure::{PRESSURE_PLACEHOLDER, PressureDisplay};
pub use service::{CommitOutcome, HoldMachine, HoldState};
pub use snapshot::{RailSnapshot, RailSnapshotStore};
pub use status::{StatusLevel, StatusLine};
pub use terminal::{TerminalBridge, TerminalStatus};

pub use model::{BENCH_COUNT, BenchId, ChannelKind, Rail};

// Wire types the front-ends render directly.
pub use benchdeck_api::{
    BenchClient, BenchNames, DeviceState, HealthReport, LogLine, LogTail, PressureReading,
    TerminalSize, TlsMode,
};

// benchdeck-api: Async Rust client for the bench controller REST API
// and its Socket.IO terminal channel.

pub mod client;
pub mod error;
pub mod models;
pub mod names;
pub mod socketio;
pub mod state;
pub mod system;
pub mod terminal;
pub mod transport;

pub use client::BenchClient;
pub use error::Error;
pub use models::{
    BenchNames, DeviceState, HealthReport, LogLine, LogTail, PressureReading,
};
pub use terminal::{TerminalChannel, TerminalEvent, TerminalSize};
pub use transport::{TlsMode, TransportConfig};

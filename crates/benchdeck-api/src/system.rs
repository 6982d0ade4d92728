// System endpoints
//
// Health, air pressure, USB port control and the action log tail.

use serde_json::json;
use tracing::debug;

use crate::client::{BenchClient, decode};
use crate::error::Error;
use crate::models::{DeviceState, HealthReport, LogTail, PressureReading, RawPressure};
use crate::state::WriteAck;

/// Largest tail the controller will serve.
pub const LOG_TAIL_MAX: u32 = 2000;

impl BenchClient {
    /// Hardware availability (I2C bus, expanders, ADC, MQTT).
    ///
    /// `GET /api/health`
    pub async fn health(&self) -> Result<HealthReport, Error> {
        let url = self.api_url("health")?;
        self.get(url).await
    }

    /// Current air tank pressure.
    ///
    /// A missing sensor is not an error: the controller answers `ok: false`
    /// with `psi: 0`. A non-numeric `psi` is reported as malformed.
    ///
    /// `GET /api/air_pressure`
    pub async fn air_pressure(&self) -> Result<PressureReading, Error> {
        let url = self.api_url("air_pressure")?;
        let value: serde_json::Value = self.get(url).await?;
        let body = value.to_string();
        let raw: RawPressure = decode(&body)?;
        raw.into_reading(&body)
    }

    /// Switch the data lines and VBUS of a front-panel USB port (1-4).
    ///
    /// Both halves are always sent: the controller treats a missing field
    /// as `true`.
    ///
    /// `POST /api/usb` with `{"port": n, "data": bool, "vbus": bool}`
    pub async fn set_usb_port(&self, port: u8, data: bool, vbus: bool) -> Result<DeviceState, Error> {
        let url = self.api_url("usb")?;
        debug!(port, data, vbus, "setting USB port");
        let ack: WriteAck = self
            .post(url, &json!({ "port": port, "data": data, "vbus": vbus }))
            .await?;
        self.state_from_ack(ack).await
    }

    /// Last `n` records of the action log. `n` is clamped to `1..=2000`.
    ///
    /// `GET /api/log_tail?n={n}`
    pub async fn log_tail(&self, n: u32) -> Result<LogTail, Error> {
        let mut url = self.api_url("log_tail")?;
        let n = n.clamp(1, LOG_TAIL_MAX);
        url.query_pairs_mut().append_pair("n", &n.to_string());
        self.get(url).await
    }
}

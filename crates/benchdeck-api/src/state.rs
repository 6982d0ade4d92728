// Channel endpoints
//
// Full-state fetch plus the three write paths that change channels:
// single channel set, bench service mode, and the global all-off.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::BenchClient;
use crate::error::Error;
use crate::models::{DeviceState, StateEnvelope};

/// Acknowledgement returned by write endpoints.
///
/// The controller answers `{"ok": true, ...}`; some builds also echo the
/// full mapping under `state`, in which case no follow-up fetch is needed.
#[derive(Debug, Deserialize)]
pub(crate) struct WriteAck {
    #[serde(default)]
    pub(crate) state: Option<serde_json::Value>,
}

impl BenchClient {
    /// Fetch the complete channel mapping.
    ///
    /// `GET /api/state`
    pub async fn fetch_state(&self) -> Result<DeviceState, Error> {
        let url = self.api_url("state")?;
        let envelope: StateEnvelope = self.get(url).await?;
        Ok(envelope.state)
    }

    /// Set one named boolean channel and return the resulting state.
    ///
    /// `POST /api/set` with `{"channel": "...", "state": bool}`
    pub async fn set_channel(&self, channel: &str, on: bool) -> Result<DeviceState, Error> {
        let url = self.api_url("set")?;
        debug!(channel, on, "setting channel");
        let ack: WriteAck = self
            .post(url, &json!({ "channel": channel, "state": on }))
            .await?;
        self.state_from_ack(ack).await
    }

    /// Enter or leave service mode for one bench.
    ///
    /// `bench` is the wire name (`bench1`..`bench4`). Entering service mode
    /// makes the controller kill the bench rails before raising VBUS.
    ///
    /// `POST /api/bench_service` with `{"bench": "...", "enable": bool}`
    pub async fn set_service_mode(&self, bench: &str, enable: bool) -> Result<DeviceState, Error> {
        let url = self.api_url("bench_service")?;
        debug!(bench, enable, "setting service mode");
        let ack: WriteAck = self
            .post(url, &json!({ "bench": bench, "enable": enable }))
            .await?;
        self.state_from_ack(ack).await
    }

    /// Switch every rail and port off.
    ///
    /// Not reversible without re-enabling channels by hand; callers gate
    /// this behind an explicit confirmation.
    ///
    /// `POST /api/all_off` with `{}`
    pub async fn all_off(&self) -> Result<DeviceState, Error> {
        let url = self.api_url("all_off")?;
        debug!("switching everything off");
        let ack: WriteAck = self.post(url, &json!({})).await?;
        self.state_from_ack(ack).await
    }

    /// Resolve the post-write state: the echoed mapping when present,
    /// otherwise a fresh `GET /api/state`.
    pub(crate) async fn state_from_ack(&self, ack: WriteAck) -> Result<DeviceState, Error> {
        match ack.state {
            Some(value @ serde_json::Value::Object(_)) => {
                let body = value.to_string();
                serde_json::from_value(value).map_err(|e| Error::MalformedResponse {
                    message: format!("state mapping: {e}"),
                    body,
                })
            }
            _ => self.fetch_state().await,
        }
    }
}

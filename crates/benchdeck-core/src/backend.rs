// ── Backend seam ──
//
// The panel talks to the controller only through `BenchBackend`, so the
// service commit and the poller can run against an in-memory backend in
// tests. `BenchClient` is the production implementation.

use std::future::Future;

use benchdeck_api::{BenchClient, BenchNames, DeviceState, PressureReading};

use crate::error::CoreError;
use crate::model::BenchId;

/// Remote operations the panel issues. Every call is an independent
/// round-trip with no retry.
pub trait BenchBackend: Send + Sync + 'static {
    fn fetch_state(&self) -> impl Future<Output = Result<DeviceState, CoreError>> + Send;

    fn set_channel(
        &self,
        channel: &str,
        on: bool,
    ) -> impl Future<Output = Result<DeviceState, CoreError>> + Send;

    fn set_service_mode(
        &self,
        bench: BenchId,
        enable: bool,
    ) -> impl Future<Output = Result<DeviceState, CoreError>> + Send;

    /// Irreversible without manual re-enable. Gate behind confirmation.
    fn all_off(&self) -> impl Future<Output = Result<DeviceState, CoreError>> + Send;

    fn air_pressure(&self) -> impl Future<Output = Result<PressureReading, CoreError>> + Send;

    fn bench_names(&self) -> impl Future<Output = Result<BenchNames, CoreError>> + Send;
}

impl BenchBackend for BenchClient {
    async fn fetch_state(&self) -> Result<DeviceState, CoreError> {
        Ok(BenchClient::fetch_state(self).await?)
    }

    async fn set_channel(&self, channel: &str, on: bool) -> Result<DeviceState, CoreError> {
        Ok(BenchClient::set_channel(self, channel, on).await?)
    }

    async fn set_service_mode(&self, bench: BenchId, enable: bool) -> Result<DeviceState, CoreError> {
        Ok(BenchClient::set_service_mode(self, &bench.wire_name(), enable).await?)
    }

    async fn all_off(&self) -> Result<DeviceState, CoreError> {
        Ok(BenchClient::all_off(self).await?)
    }

    async fn air_pressure(&self) -> Result<PressureReading, CoreError> {
        Ok(BenchClient::air_pressure(self).await?)
    }

    async fn bench_names(&self) -> Result<BenchNames, CoreError> {
        Ok(BenchClient::bench_names(self).await?)
    }
}

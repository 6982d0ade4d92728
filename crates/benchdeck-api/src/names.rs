// Bench name endpoints
//
// Operator labels for the four benches, stored by the controller.

use tracing::debug;

use crate::client::BenchClient;
use crate::error::Error;
use crate::models::BenchNames;

impl BenchClient {
    /// Fetch the current bench labels.
    ///
    /// `GET /api/bench_names`
    pub async fn bench_names(&self) -> Result<BenchNames, Error> {
        let url = self.api_url("bench_names")?;
        self.get(url).await
    }

    /// Replace all four bench labels. Returns the stored names.
    ///
    /// Older controllers answer with a bare `{"ok": true}`; the submitted
    /// names are returned in that case.
    ///
    /// `POST /api/bench_names` with `{"b1": "...", ..., "b4": "..."}`
    pub async fn set_bench_names(&self, names: &BenchNames) -> Result<BenchNames, Error> {
        let url = self.api_url("bench_names")?;
        debug!(?names, "saving bench names");
        let value: serde_json::Value = self.post(url, names).await?;

        let echoed = ["b1", "b2", "b3", "b4"]
            .iter()
            .any(|key| value.get(key).is_some());
        if !echoed {
            return Ok(names.clone());
        }
        let body = value.to_string();
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse {
            message: format!("bench names: {e}"),
            body,
        })
    }
}

// Bench controller HTTP client
//
// Wraps `reqwest::Client` with `/api/{path}` URL construction and response
// checking. Endpoint groups (state, system, names) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the bench controller.
///
/// Every call is an independent round-trip. Nothing is batched, retried,
/// or cached; a failure is handed straight back to the caller.
#[derive(Debug, Clone)]
pub struct BenchClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BenchClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the controller root, e.g. `http://bench-pi.local:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let (_, body) = Self::read_body(resp).await?;
        decode(&body)
    }

    /// Send a POST request with a JSON body and decode the acknowledgement.
    ///
    /// Write endpoints answer `{"ok": true, ...}`; an `"ok": false` body is
    /// treated like a non-success status even when the HTTP status is 2xx.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        let (status, body) = Self::read_body(resp).await?;

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if value.get("ok") == Some(&serde_json::Value::Bool(false)) {
                return Err(Error::Request { status, body });
            }
        }

        decode(&body)
    }

    /// Read the full body, converting non-success statuses into
    /// `Error::Request` carrying the status and the body text.
    async fn read_body(resp: reqwest::Response) -> Result<(u16, String), Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Request {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(len = body.len(), "response body received");
        Ok((status.as_u16(), body))
    }
}

/// Decode a JSON body, keeping a preview of the text for diagnostics.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::MalformedResponse {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

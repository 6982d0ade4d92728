// Wire types for the bench controller API.
//
// These mirror the JSON bodies the controller sends. Domain meaning
// (benches, rails, service mode) is layered on top by `benchdeck-core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Device state ─────────────────────────────────────────────────────

/// Authoritative channel mapping as last reported by the controller.
///
/// Always replaced wholesale; there is no merge operation.
/// Channels missing from the mapping read as `false`, which is how the
/// controller itself treats unknown channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(BTreeMap<String, bool>);

impl DeviceState {
    pub fn new(channels: BTreeMap<String, bool>) -> Self {
        Self(channels)
    }

    /// Boolean value of a channel; unknown channels are off.
    pub fn get(&self, channel: &str) -> bool {
        self.0.get(channel).copied().unwrap_or(false)
    }

    /// Whether the controller reported this channel at all.
    pub fn contains(&self, channel: &str) -> bool {
        self.0.contains_key(channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Channels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn into_inner(self) -> BTreeMap<String, bool> {
        self.0
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for DeviceState {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// `GET /api/state` body: `{ "state": { <channel>: bool, ... } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct StateEnvelope {
    pub state: DeviceState,
}

// ── Pressure ─────────────────────────────────────────────────────────

/// Air tank pressure reading from the ADS1115 sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureReading {
    /// Whether the ADC is present (`ok` on the wire).
    pub sensor_available: bool,
    pub psi: f64,
    /// Sensor wiring mode (`divider` or `bypass`).
    pub mode: Option<String>,
    pub max_psi: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPressure {
    #[serde(default)]
    pub ok: bool,
    pub psi: Option<serde_json::Value>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub max_psi: Option<f64>,
}

impl RawPressure {
    /// Validate the loosely-typed body. A non-numeric `psi` is malformed.
    pub(crate) fn into_reading(self, body: &str) -> Result<PressureReading, Error> {
        let psi = self
            .psi
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::MalformedResponse {
                message: format!("non-numeric psi: {:?}", self.psi),
                body: body.to_owned(),
            })?;
        Ok(PressureReading {
            sensor_available: self.ok,
            psi,
            mode: self.mode,
            max_psi: self.max_psi,
        })
    }
}

// ── Bench names ──────────────────────────────────────────────────────

/// Operator-assigned bench labels, keyed `b1`..`b4` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchNames {
    #[serde(default)]
    pub b1: String,
    #[serde(default)]
    pub b2: String,
    #[serde(default)]
    pub b3: String,
    #[serde(default)]
    pub b4: String,
}

impl BenchNames {
    /// Name for bench `n` (1-4). Out-of-range benches have no name.
    pub fn get(&self, n: u8) -> Option<&str> {
        match n {
            1 => Some(&self.b1),
            2 => Some(&self.b2),
            3 => Some(&self.b3),
            4 => Some(&self.b4),
            _ => None,
        }
    }

    /// Set the name for bench `n`. Returns `false` when out of range.
    pub fn set(&mut self, n: u8, name: impl Into<String>) -> bool {
        let slot = match n {
            1 => &mut self.b1,
            2 => &mut self.b2,
            3 => &mut self.b3,
            4 => &mut self.b4,
            _ => return false,
        };
        *slot = name.into().trim().to_owned();
        true
    }
}

// ── Health ───────────────────────────────────────────────────────────

/// Hardware availability on the controller (`GET /api/health`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub i2c: bool,
    #[serde(default)]
    pub i2c_error: Option<String>,
    #[serde(default)]
    pub mcp1: bool,
    #[serde(default)]
    pub mcp2: bool,
    #[serde(default)]
    pub ads: bool,
    #[serde(default)]
    pub mqtt: bool,
}

// ── Action log ───────────────────────────────────────────────────────

/// One record of the controller's JSONL action log.
///
/// Lines the controller could not parse come back as `{"raw": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub bench: Option<String>,
    #[serde(default)]
    pub rail: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub state: Option<bool>,
    #[serde(default)]
    pub raw: Option<String>,
    /// All remaining fields (`ip`, `route`, `prev`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LogLine {
    /// One-line rendering: `ts  event  bench  rail  ON|OFF`.
    pub fn summary(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut msg = format!(
            "{}  {}",
            self.ts.as_deref().unwrap_or(""),
            self.event.as_deref().unwrap_or("")
        );
        for part in [&self.bench, &self.rail].into_iter().flatten() {
            if !part.is_empty() {
                msg.push_str("  ");
                msg.push_str(part);
            }
        }
        if let Some(on) = self.state {
            msg.push_str(if on { "  ON" } else { "  OFF" });
        }
        msg
    }
}

/// `GET /api/log_tail` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogTail {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub lines: Vec<LogLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_missing_channel_reads_off() {
        let state: DeviceState = [("bench1_5v", true)].into_iter().collect();
        assert!(state.get("bench1_5v"));
        assert!(!state.get("bench1_hv"));
        assert!(!state.contains("bench1_hv"));
    }

    #[test]
    fn device_state_rejects_non_boolean_values() {
        let result = serde_json::from_str::<StateEnvelope>(r#"{"state":{"lights":"on"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pressure_rejects_string_psi() {
        let body = r#"{"psi":"abc"}"#;
        let raw: RawPressure = serde_json::from_str(body).expect("shape parses");
        assert!(matches!(
            raw.into_reading(body),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn pressure_accepts_numeric_psi() {
        let body = r#"{"ok":true,"psi":87.25,"mode":"divider","max_psi":200.0}"#;
        let raw: RawPressure = serde_json::from_str(body).expect("shape parses");
        let reading = raw.into_reading(body).expect("numeric psi");
        assert!(reading.sensor_available);
        assert!((reading.psi - 87.25).abs() < f64::EPSILON);
        assert_eq!(reading.mode.as_deref(), Some("divider"));
    }

    #[test]
    fn bench_names_trim_and_range() {
        let mut names = BenchNames::default();
        assert!(names.set(2, "  Amp rework "));
        assert!(!names.set(5, "nope"));
        assert_eq!(names.get(2), Some("Amp rework"));
        assert_eq!(names.get(0), None);
    }

    #[test]
    fn log_line_summary_formats_rail_change() {
        let line: LogLine = serde_json::from_value(serde_json::json!({
            "ts": "2026-01-05T10:00:00+00:00",
            "event": "rail_change",
            "bench": "bench2",
            "rail": "12v",
            "state": true,
            "prev": false
        }))
        .expect("valid record");
        assert_eq!(
            line.summary(),
            "2026-01-05T10:00:00+00:00  rail_change  bench2  12v  ON"
        );
        assert_eq!(line.extra["prev"], false);
    }

    #[test]
    fn log_line_summary_passes_raw_through() {
        let line = LogLine {
            raw: Some("not json".into()),
            ..LogLine::default()
        };
        assert_eq!(line.summary(), "not json");
    }
}

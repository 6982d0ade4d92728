// ── Pressure display ──

use std::fmt;

use benchdeck_api::PressureReading;

use crate::error::CoreError;

/// Shown whenever there is no usable reading.
pub const PRESSURE_PLACEHOLDER: &str = "-- psi";

/// What the pressure gauge shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PressureDisplay {
    /// Not fetched yet.
    #[default]
    Unknown,
    Reading { psi: f64, max_psi: Option<f64> },
    /// Sensor absent or the last fetch failed.
    Unavailable { reason: String },
}

impl PressureDisplay {
    /// Fold a fetch result into a display value. Never fails.
    pub fn from_result(result: Result<PressureReading, CoreError>) -> Self {
        match result {
            Ok(reading) if reading.sensor_available => Self::Reading {
                psi: reading.psi,
                max_psi: reading.max_psi,
            },
            Ok(_) => Self::Unavailable {
                reason: "pressure sensor not available".into(),
            },
            Err(e) => Self::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    /// Fill ratio against `max_psi`, clamped to `0.0..=1.0`.
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Self::Reading {
                psi,
                max_psi: Some(max),
            } if *max > 0.0 => Some((psi / max).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

impl fmt::Display for PressureDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading { psi, .. } => write!(f, "{psi:.1} psi"),
            Self::Unknown | Self::Unavailable { .. } => f.write_str(PRESSURE_PLACEHOLDER),
        }
    }
}

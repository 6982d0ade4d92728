// ── Bench and rail identifiers ──
//
// Four identical benches, each with three rails and one VBUS enable that
// doubles as the service-mode flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Number of benches on a panel.
pub const BENCH_COUNT: u8 = 4;

/// Bench number, always in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BenchId(u8);

impl BenchId {
    pub const ALL: [Self; 4] = [Self(1), Self(2), Self(3), Self(4)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=BENCH_COUNT).contains(&n).then_some(Self(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Name used by `/api/bench_service` (`bench1`).
    pub fn wire_name(self) -> String {
        format!("bench{}", self.0)
    }

    /// Channel name of one rail (`bench1_12v`).
    pub fn rail_channel(self, rail: Rail) -> String {
        format!("bench{}_{}", self.0, rail.as_ref())
    }

    /// VBUS enable whose value is the bench's service-mode flag.
    pub fn vbus_channel(self) -> String {
        format!("port{}_vcc_en", self.0)
    }

    /// Fallback label when the operator has not named the bench.
    pub fn default_label(self) -> String {
        format!("Bench {}", self.0)
    }
}

impl fmt::Display for BenchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bench{}", self.0)
    }
}

impl TryFrom<u8> for BenchId {
    type Error = CoreError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n).ok_or_else(|| CoreError::UnknownBench {
            value: n.to_string(),
        })
    }
}

impl From<BenchId> for u8 {
    fn from(id: BenchId) -> Self {
        id.0
    }
}

/// Accepts `3`, `b3` and `bench3`.
impl FromStr for BenchId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let digits = trimmed
            .strip_prefix("bench")
            .or_else(|| trimmed.strip_prefix('b'))
            .unwrap_or(&trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| CoreError::UnknownBench {
                value: s.to_owned(),
            })
    }
}

/// One of a bench's three power outputs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Rail {
    #[strum(serialize = "5v")]
    #[serde(rename = "5v")]
    V5,
    #[strum(serialize = "12v")]
    #[serde(rename = "12v")]
    V12,
    #[strum(serialize = "hv")]
    #[serde(rename = "hv")]
    Hv,
}

impl Rail {
    /// Energize order: lower voltages first.
    pub const POWER_UP: [Self; 3] = [Self::V5, Self::V12, Self::Hv];

    /// De-energize order, the reverse of [`POWER_UP`](Self::POWER_UP).
    pub const KILL: [Self; 3] = [Self::Hv, Self::V12, Self::V5];

    /// Panel label.
    pub fn label(self) -> &'static str {
        match self {
            Self::V5 => "5V",
            Self::V12 => "12V",
            Self::Hv => "HV",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_channel_names() {
        let bench = BenchId::new(2).expect("valid bench");
        assert_eq!(bench.wire_name(), "bench2");
        assert_eq!(bench.rail_channel(Rail::V5), "bench2_5v");
        assert_eq!(bench.rail_channel(Rail::V12), "bench2_12v");
        assert_eq!(bench.rail_channel(Rail::Hv), "bench2_hv");
        assert_eq!(bench.vbus_channel(), "port2_vcc_en");
    }

    #[test]
    fn bench_range_is_enforced() {
        assert!(BenchId::new(0).is_none());
        assert!(BenchId::new(5).is_none());
        assert_eq!(BenchId::ALL.len(), usize::from(BENCH_COUNT));
    }

    #[test]
    fn bench_parses_loose_forms() {
        for input in ["3", "b3", "bench3", " Bench3 "] {
            let bench: BenchId = input.parse().expect("valid bench");
            assert_eq!(bench.number(), 3, "input {input:?}");
        }
        assert!("bench9".parse::<BenchId>().is_err());
        assert!("rails".parse::<BenchId>().is_err());
    }

    #[test]
    fn rail_parses_case_insensitively() {
        assert_eq!("HV".parse::<Rail>().expect("valid rail"), Rail::Hv);
        assert_eq!("12v".parse::<Rail>().expect("valid rail"), Rail::V12);
        assert_eq!(Rail::V5.to_string(), "5v");
    }
}

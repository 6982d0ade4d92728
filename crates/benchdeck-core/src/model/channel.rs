// ── Channel catalogue ──
//
// Every boolean channel the controller exposes, classified by role.

use std::sync::LazyLock;

use strum::IntoEnumIterator;

use super::bench::{BenchId, Rail};

/// What a named channel drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// One of a bench's power rails.
    Rail { bench: BenchId, rail: Rail },
    /// USB VBUS enable; for ports 1-4 this is also the bench service flag.
    Vbus { port: u8 },
    /// USB data gate for ports 3 and 4.
    UsbData { port: u8 },
    /// Local/remote select. `true` means remote.
    LocalRemote { index: u8 },
    Lights,
    AirCompressor,
    /// Status lamps, stack light and ring lights.
    Indicator,
    Spare,
}

impl ChannelKind {
    /// Short group label for listings.
    pub fn group(self) -> &'static str {
        match self {
            Self::Rail { .. } => "rail",
            Self::Vbus { .. } => "vbus",
            Self::UsbData { .. } => "usb-data",
            Self::LocalRemote { .. } => "local-remote",
            Self::Lights | Self::AirCompressor => "facility",
            Self::Indicator => "indicator",
            Self::Spare => "spare",
        }
    }
}

const FIXED: &[(&str, ChannelKind)] = &[
    ("port3_en", ChannelKind::UsbData { port: 3 }),
    ("port4_en", ChannelKind::UsbData { port: 4 }),
    ("lr1", ChannelKind::LocalRemote { index: 1 }),
    ("lr2", ChannelKind::LocalRemote { index: 2 }),
    ("lights", ChannelKind::Lights),
    ("air_compressor", ChannelKind::AirCompressor),
    ("stat_1", ChannelKind::Indicator),
    ("stat_2", ChannelKind::Indicator),
    ("stack_r", ChannelKind::Indicator),
    ("stack_a", ChannelKind::Indicator),
    ("stack_g", ChannelKind::Indicator),
    ("ring_1", ChannelKind::Indicator),
    ("ring_2", ChannelKind::Indicator),
    ("spare_1", ChannelKind::Spare),
    ("spare_2", ChannelKind::Spare),
    ("spare_3", ChannelKind::Spare),
];

static CATALOGUE: LazyLock<Vec<(String, ChannelKind)>> = LazyLock::new(|| {
    let mut all = Vec::with_capacity(12 + 4 + FIXED.len());
    for bench in BenchId::ALL {
        for rail in Rail::iter() {
            all.push((bench.rail_channel(rail), ChannelKind::Rail { bench, rail }));
        }
    }
    for bench in BenchId::ALL {
        all.push((
            bench.vbus_channel(),
            ChannelKind::Vbus {
                port: bench.number(),
            },
        ));
    }
    all.extend(FIXED.iter().map(|(name, kind)| ((*name).to_owned(), *kind)));
    all
});

/// All known channels with their kind, rails first.
pub fn catalogue() -> &'static [(String, ChannelKind)] {
    &CATALOGUE
}

/// Kind of a channel name, or `None` for channels the panel does not know.
pub fn classify(name: &str) -> Option<ChannelKind> {
    CATALOGUE
        .iter()
        .find(|(known, _)| known == name)
        .map(|(_, kind)| *kind)
}

pub fn is_known(name: &str) -> bool {
    classify(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_covers_every_controller_channel() {
        assert_eq!(catalogue().len(), 32);
        assert!(is_known("bench4_hv"));
        assert!(is_known("port1_vcc_en"));
        assert!(is_known("stack_g"));
        assert!(!is_known("bench5_5v"));
        assert!(!is_known("port1_en"));
    }

    #[test]
    fn classify_rail_and_vbus() {
        let bench = BenchId::new(3).expect("valid bench");
        assert_eq!(
            classify("bench3_12v"),
            Some(ChannelKind::Rail {
                bench,
                rail: Rail::V12
            })
        );
        assert_eq!(classify("port3_vcc_en"), Some(ChannelKind::Vbus { port: 3 }));
        assert_eq!(classify("lights").map(ChannelKind::group), Some("facility"));
    }
}

//! Band classifier: a pure mapping from a frequency in kHz to an amateur band.
//!
//! This is the leaf of the pipeline (spec §4.1, §2.1). The mapping is keyed
//! on `round(freq_khz / 1000)` exactly as the original `fqbandindex()`.

use serde::Serialize;
use std::fmt;

/// Number of recognized amateur bands, 160m through 2m.
pub const BAND_COUNT: usize = 12;

/// One of the 12 amateur bands the engine tracks deviation for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Band {
    B160m = 0,
    B80m = 1,
    B60m = 2,
    B40m = 3,
    B30m = 4,
    B20m = 5,
    B17m = 6,
    B15m = 7,
    B12m = 8,
    B10m = 9,
    B6m = 10,
    B2m = 11,
}

impl Band {
    /// All bands in index order, for iterating a `[BandState; BAND_COUNT]`.
    pub const ALL: [Band; BAND_COUNT] = [
        Band::B160m,
        Band::B80m,
        Band::B60m,
        Band::B40m,
        Band::B30m,
        Band::B20m,
        Band::B17m,
        Band::B15m,
        Band::B12m,
        Band::B10m,
        Band::B6m,
        Band::B2m,
    ];

    /// Index into a per-band array, 0..BAND_COUNT.
    pub const fn index(self) -> usize {
        self as usize
    }

    fn from_index(i: usize) -> Self {
        Self::ALL[i]
    }

    /// Human-friendly name ("20m", "160m", ...) used in reports and JSON.
    pub const fn name(self) -> &'static str {
        match self {
            Band::B160m => "160m",
            Band::B80m => "80m",
            Band::B60m => "60m",
            Band::B40m => "40m",
            Band::B30m => "30m",
            Band::B20m => "20m",
            Band::B17m => "17m",
            Band::B15m => "15m",
            Band::B12m => "12m",
            Band::B10m => "10m",
            Band::B6m => "6m",
            Band::B2m => "2m",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classify a frequency in kHz into a band, or `None` if it falls outside
/// every recognized amateur allocation.
///
/// Mirrors `fqbandindex()` in the original C sources: the decision is made
/// on `round(freq_khz / 1000)`, not on the raw frequency, so e.g. 1999.9
/// rounds to 2 (160m) while 999.4 rounds to 1 and classifies as unknown.
pub fn classify(freq_khz: f64) -> Option<Band> {
    let mhz = (freq_khz / 1000.0).round() as i64;
    let idx = match mhz {
        2 => 0,
        3 | 4 => 1,
        5 => 2,
        7 => 3,
        10 => 4,
        14 => 5,
        18 => 6,
        21 => 7,
        25 => 8,
        28..=30 => 9,
        50..=54 => 10,
        144..=146 => 11,
        _ => return None,
    };
    Some(Band::from_index(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bands() {
        assert_eq!(classify(1820.0), Some(Band::B160m));
        assert_eq!(classify(3525.0), Some(Band::B80m));
        assert_eq!(classify(4000.0), Some(Band::B80m));
        assert_eq!(classify(5350.0), Some(Band::B60m));
        assert_eq!(classify(7030.0), Some(Band::B40m));
        assert_eq!(classify(10120.0), Some(Band::B30m));
        assert_eq!(classify(14020.0), Some(Band::B20m));
        assert_eq!(classify(18100.0), Some(Band::B17m));
        assert_eq!(classify(21025.0), Some(Band::B15m));
        assert_eq!(classify(24920.0), Some(Band::B12m));
        assert_eq!(classify(28025.0), Some(Band::B10m));
        assert_eq!(classify(29500.0), Some(Band::B10m));
        assert_eq!(classify(50100.0), Some(Band::B6m));
        assert_eq!(classify(144200.0), Some(Band::B2m));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify(999.0), None);
        assert_eq!(classify(12000.0), None);
        assert_eq!(classify(200000.0), None);
    }

    #[test]
    fn test_rounding_boundary() {
        // round(2499/1000) = 2 -> 160m; round(2500/1000) = 3 (ties away from zero) -> 80m
        assert_eq!(classify(2499.0), Some(Band::B160m));
        assert_eq!(classify(2500.0), Some(Band::B80m));
    }

    #[test]
    fn test_index_round_trip() {
        for band in Band::ALL {
            assert_eq!(Band::from_index(band.index()), band);
        }
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_classify_agrees_with_rounded_mhz(freq_khz in 0.0f64..300_000.0) {
            let result = classify(freq_khz);
            let mhz = (freq_khz / 1000.0).round() as i64;
            match result {
                Some(band) => {
                    let rounded_from_band: i64 = match band {
                        Band::B160m => 2,
                        Band::B80m => mhz, // 3 or 4, both map here
                        Band::B60m => 5,
                        Band::B40m => 7,
                        Band::B30m => 10,
                        Band::B20m => 14,
                        Band::B17m => 18,
                        Band::B15m => 21,
                        Band::B12m => 25,
                        Band::B10m => mhz, // 28..=30
                        Band::B6m => mhz,  // 50..=54
                        Band::B2m => mhz,  // 144..=146
                    };
                    prop_assert_eq!(rounded_from_band, mhz);
                }
                None => {
                    let known: &[i64] = &[2, 3, 4, 5, 7, 10, 14, 18, 21, 25, 28, 29, 30, 50, 51, 52, 53, 54, 144, 145, 146];
                    prop_assert!(!known.contains(&mhz));
                }
            }
        }
    }
}

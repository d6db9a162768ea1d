//! Configuration for the skew engine.
//!
//! Loads settings from `~/.config/skew-engine/config.toml` on Linux (or
//! platform-appropriate location elsewhere), falling back to the defaults
//! in spec §6 when the file is absent. Every "constant" spec §6 lists as
//! "configurable" lives here rather than as a source-level `#define`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::spot::Mode;

/// Which form of the IIR filter coefficient to use (spec §9, REDESIGN
/// FLAGS — the source disagrees between revisions; `Sqrt` is the
/// documented intended final design).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterCoefficient {
    /// `alpha = freq / (tc * 14000)` — earlier source revision.
    Linear,
    /// `alpha = sqrt(freq / 14000) / tc` — later, preferred revision.
    #[default]
    Sqrt,
}

impl FilterCoefficient {
    /// Compute the IIR coefficient for a reference spot at `freq_khz`.
    pub fn alpha(self, freq_khz: f64, tc: f64) -> f64 {
        match self {
            FilterCoefficient::Linear => freq_khz / (tc * 14000.0),
            FilterCoefficient::Sqrt => (freq_khz / 14000.0).sqrt() / tc,
        }
    }
}

/// Engine-wide tunable constants (spec §6 "Constants").
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the spot window ring buffer.
    pub spots_window: usize,
    /// Capacity of the skimmer table before overflow-clear (§4.5).
    pub max_skimmers: usize,
    /// Capacity of the reference registry (§4.2).
    pub max_ref: usize,
    /// Maximum time apart, in seconds, between a reference spot and a
    /// candidate spot for them to correlate (§4.4 predicate 6).
    pub max_apart_secs: i64,
    /// Absolute frequency tolerance in kHz (§4.4 predicate 3).
    pub max_err_khz: f64,
    /// Relative frequency tolerance in ppm (§4.4 predicate 4).
    pub max_err_ppm: f64,
    /// Minimum SNR, in dB, for a spot to be admitted (§4.3).
    pub min_snr: i32,
    /// Minimum frequency, in kHz, for a spot to be admitted (§4.3).
    pub min_freq_khz: f64,
    /// Idle threshold, in seconds, after which a band (and transitively a
    /// skimmer) is demoted to inactive (§4.6). Decided at 900s — see
    /// DESIGN.md for the Open Question resolution.
    pub max_inact_secs: i64,
    /// IIR filter time constant (§4.5).
    pub tc: f64,
    /// UTC hour at which the reference registry refresh becomes eligible
    /// to fire (§4.2).
    pub refupdhour: u32,
    /// UTC minute past `refupdhour` after which the refresh fires (§4.2).
    pub refupdminute: u32,
    /// Minimum qualified-spot count for a skimmer to be written to the
    /// regenerated reference file by the bootstrap analyzer (§4.8).
    pub min_ref_spots: u32,
    /// Transmission mode this engine instance admits spots for.
    pub mode: Mode,
    /// Which IIR coefficient formula to use (§9 REDESIGN FLAGS).
    pub filter_coefficient: FilterCoefficient,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spots_window: 1000,
            max_skimmers: 500,
            max_ref: 75,
            max_apart_secs: 30,
            max_err_khz: 0.5,
            max_err_ppm: 60.0,
            min_snr: 6,
            min_freq_khz: 1800.0,
            max_inact_secs: 900,
            tc: 50.0,
            refupdhour: 0,
            refupdminute: 30,
            min_ref_spots: 150,
            mode: Mode::Cw,
            filter_coefficient: FilterCoefficient::Sqrt,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default config file location.
    ///
    /// Returns the default config if the file doesn't exist, mirroring
    /// the behavior the original `reffilename`/`-c` flags had for missing
    /// overrides. Returns an error if the file exists but is malformed —
    /// this is a configuration-fatal error (spec §7).
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
            }
            _ => Ok(EngineConfig::default()),
        }
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("skew-engine/config.toml"))
    }

    /// Validate the configuration. Returns an error if any constant is out
    /// of a sane range — this is a configuration-fatal error (spec §7).
    pub fn validate(&self) -> Result<()> {
        if self.spots_window == 0 {
            anyhow::bail!("spots_window must be > 0");
        }
        if self.max_skimmers == 0 {
            anyhow::bail!("max_skimmers must be > 0");
        }
        if self.max_ref == 0 {
            anyhow::bail!("max_ref must be > 0");
        }
        if self.tc <= 0.0 {
            anyhow::bail!("tc must be > 0");
        }
        if self.max_apart_secs <= 0 {
            anyhow::bail!("max_apart_secs must be > 0");
        }
        if self.refupdhour > 23 {
            anyhow::bail!("refupdhour must be 0..=23");
        }
        if self.refupdminute > 59 {
            anyhow::bail!("refupdminute must be 0..=59");
        }
        Ok(())
    }
}

//! Skimmer table: per-callsign, per-band running deviation state (spec §4.5).

use std::collections::HashMap;
use tracing::warn;

use crate::band::{BAND_COUNT, Band};
use crate::config::EngineConfig;

/// The lowest band index that still counts toward the "restricted to
/// bands > 4" rule in the consolidated average (spec §4.5 step 5, §4.8
/// point 1) — i.e. 30m and below are excluded when a higher band is
/// active.
const LOWEST_PREFERRED_BAND_INDEX: usize = 4;

/// Per-band running deviation state (spec §3 `BandState`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandState {
    /// Count of qualified spots that have contributed to this band.
    pub count: u64,
    pub active: bool,
    /// Running average deviation in ppm — streaming-mode IIR state.
    /// Defaults to 0 on first use (spec §3).
    pub avdev_ppm: f64,
    /// Accumulated sum of `observed/reference` frequency ratios —
    /// batch-mode-only accumulator (spec §3, §9 "two deviation
    /// representations"). Unused by the streaming path.
    pub accadj: f64,
    pub last: i64,
    pub first: i64,
    /// Quality metric 0..9, batch mode only (spec §4.8).
    pub quality: u8,
}

/// A tracked skimmer and its per-band deviation state (spec §3 `Skimmer`).
#[derive(Debug, Clone)]
pub struct Skimmer {
    pub call: String,
    pub reference: bool,
    pub active: bool,
    pub last: i64,
    /// Consolidated deviation across active bands (spec §4.5 step 5).
    pub avdev_ppm: f64,
    pub bands: [BandState; BAND_COUNT],
}

impl Skimmer {
    fn new(call: String, reference: bool) -> Self {
        Self {
            call,
            reference,
            active: false,
            last: 0,
            avdev_ppm: 0.0,
            bands: [BandState::default(); BAND_COUNT],
        }
    }

    /// Recompute `active` as the logical OR of all bands (spec §3
    /// invariant, §4.6).
    pub fn recompute_active(&mut self) {
        self.active = self.bands.iter().any(|b| b.active);
    }

    /// Recompute the consolidated `avdev_ppm` as the mean of `avdev_ppm`
    /// over active bands restricted to index > `LOWEST_PREFERRED_BAND_INDEX`,
    /// falling back to the mean over all active bands if none qualify
    /// (spec §4.5 step 5). Only called where at least one band is active,
    /// so the division is never by zero.
    pub fn recompute_consolidated_avdev(&mut self) {
        let preferred: Vec<f64> = self
            .bands
            .iter()
            .enumerate()
            .filter(|(i, b)| *i > LOWEST_PREFERRED_BAND_INDEX && b.active)
            .map(|(_, b)| b.avdev_ppm)
            .collect();

        let chosen = if !preferred.is_empty() {
            preferred
        } else {
            self.bands
                .iter()
                .filter(|b| b.active)
                .map(|b| b.avdev_ppm)
                .collect()
        };

        assert!(
            !chosen.is_empty(),
            "recompute_consolidated_avdev called with no active band"
        );
        self.avdev_ppm = chosen.iter().sum::<f64>() / chosen.len() as f64;
    }
}

/// A single correlation event produced by the correlation engine (spec
/// §4.4's `(candidate_skimmer, band, deviation_ppm, timestamp)` tuple,
/// extended with the triggering reference spot's frequency — needed by
/// the IIR coefficient formula in §4.5 step 2, which is a function of
/// `R.freq`, not just the band it maps to).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationEvent {
    pub candidate: String,
    pub candidate_is_reference: bool,
    pub band: Band,
    pub delta_ppm: f64,
    pub timestamp: i64,
    pub ref_freq_khz: f64,
}

/// Keyed (by callsign) store of skimmer deviation state (spec §4.5).
pub struct SkimmerTable {
    max_skimmers: usize,
    skimmers: HashMap<String, Skimmer>,
}

impl SkimmerTable {
    pub fn new(max_skimmers: usize) -> Self {
        Self {
            max_skimmers,
            skimmers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.skimmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skimmers.is_empty()
    }

    pub fn get(&self, call: &str) -> Option<&Skimmer> {
        self.skimmers.get(call)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skimmer> {
        self.skimmers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Skimmer> {
        self.skimmers.values_mut()
    }

    /// Look up `call`, inserting a fresh entry (overflow-clearing the
    /// table first if at capacity — spec §4.5 "Overflow policy") if
    /// absent.
    fn get_or_insert(&mut self, call: &str, reference: bool) -> &mut Skimmer {
        if !self.skimmers.contains_key(call) && self.skimmers.len() >= self.max_skimmers {
            warn!(
                max_skimmers = self.max_skimmers,
                "skimmer table overflow; clearing table"
            );
            self.skimmers.clear();
        }
        self.skimmers
            .entry(call.to_string())
            .or_insert_with(|| Skimmer::new(call.to_string(), reference))
    }

    /// Apply a streaming-mode correlation event: update the IIR deviation
    /// state for `event.band`, mark it (and the skimmer) active, and
    /// recompute the consolidated average (spec §4.5 steps 1-5).
    pub fn apply_streaming(&mut self, event: &CorrelationEvent, config: &EngineConfig) {
        let alpha = config
            .filter_coefficient
            .alpha(event.ref_freq_khz, config.tc);

        let skimmer = self.get_or_insert(&event.candidate, event.candidate_is_reference);
        let band_state = &mut skimmer.bands[event.band.index()];

        band_state.avdev_ppm = (1.0 - alpha) * band_state.avdev_ppm + alpha * event.delta_ppm;
        band_state.count += 1;
        band_state.last = event.timestamp;
        if band_state.count == 1 {
            band_state.first = event.timestamp;
        }
        band_state.active = true;

        skimmer.last = event.timestamp;
        skimmer.active = true;
        skimmer.recompute_consolidated_avdev();
    }

    /// Apply a batch-mode correlation: accumulate the observed/reference
    /// frequency ratio rather than running the IIR filter (spec §4.8 pass
    /// 1). `ratio = P.freq / R.freq`.
    pub fn apply_batch(
        &mut self,
        call: &str,
        is_reference: bool,
        band: Band,
        ratio: f64,
        timestamp: i64,
    ) {
        let skimmer = self.get_or_insert(call, is_reference);
        let band_state = &mut skimmer.bands[band.index()];

        band_state.accadj += ratio;
        band_state.count += 1;
        if band_state.count == 1 {
            band_state.first = timestamp;
        }
        band_state.last = timestamp;
    }

    /// Clear every skimmer's accumulators for a fresh batch pass (spec
    /// §4.8 "Pass 2: reset all accumulators").
    pub fn reset_batch_accumulators(&mut self) {
        self.skimmers.clear();
    }

    /// Reset every band's count/first/last to zero while retaining the
    /// computed averages (`avdev_ppm`, `accadj`, `quality`) — the counter
    /// wrap guard (spec §4.7) needs to keep the engine's learned state
    /// while letting all counters restart from zero.
    pub fn reset_counts_retain_averages(&mut self) {
        for skimmer in self.skimmers.values_mut() {
            for band in &mut skimmer.bands {
                band.count = 0;
                band.first = 0;
                band.last = 0;
            }
        }
    }
}

//! Spot window: a bounded ring buffer of recently accepted spots (spec §4.3).
//!
//! Slots are overwritten circularly. An unwritten (or just-overwritten)
//! slot is only ever observed via `scan()`, which skips slots with
//! `analyzed == true` — and every slot starts out that way (§9, §3
//! invariants).

use crate::config::EngineConfig;
use crate::spot::{Spot, SpotType};
use crate::wire::WireSpot;

/// Fixed-capacity ring buffer of the most recently accepted spots.
pub struct SpotWindow {
    slots: Vec<Spot>,
    write_index: usize,
}

impl SpotWindow {
    /// Create a window with `capacity` slots, all sentinel (`analyzed =
    /// true`) so a scan over a fresh window matches nothing (spec §3
    /// invariants, §9).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Spot::sentinel()).collect(),
            write_index: 0,
        }
    }

    /// Capacity of the window (`SPOTSWINDOW`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Write `spot` at the current write pointer and advance it modulo
    /// capacity (spec §4.3 `insert`).
    pub fn insert(&mut self, spot: Spot) {
        self.slots[self.write_index] = spot;
        self.write_index = (self.write_index + 1) % self.slots.len();
    }

    /// Iterate every slot, live or sentinel — callers filter on `analyzed`
    /// (spec §4.3 `scan`; order is unspecified, spec §4.4 tie-breaking).
    pub fn scan(&self) -> impl Iterator<Item = &Spot> {
        self.slots.iter()
    }

    /// Mutable iteration so the correlation engine can flip `analyzed` in
    /// place on a match.
    pub fn scan_mut(&mut self) -> impl Iterator<Item = &mut Spot> {
        self.slots.iter_mut()
    }

    /// Mark every slot analyzed without otherwise touching its contents —
    /// used by the counter-wrap guard (spec §4.7).
    pub fn mark_all_analyzed(&mut self) {
        for slot in &mut self.slots {
            slot.analyzed = true;
        }
    }
}

/// Outcome of running a [`WireSpot`] through the admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SnrTooLow,
    FreqTooLow,
    WrongMode,
    WrongSpotType,
}

/// Decide whether a wire spot is admitted to the window (spec §4.3):
/// `snr >= MINSNR`, `freq >= MINFREQ`, `mode == engine mode`, and
/// `spot_type` is CQ or DX. Returns the constructed [`Spot`] (tagged with
/// whether `de` is currently a reference skimmer) on admission, or the
/// first predicate that failed otherwise.
pub fn admit(
    wire: &WireSpot,
    is_reference: bool,
    config: &EngineConfig,
) -> Result<Spot, Rejection> {
    if wire.snr < config.min_snr {
        return Err(Rejection::SnrTooLow);
    }
    if wire.freq_khz < config.min_freq_khz {
        return Err(Rejection::FreqTooLow);
    }
    match wire.mode {
        Some(m) if m == config.mode => {}
        _ => return Err(Rejection::WrongMode),
    }
    if !matches!(wire.spot_type, SpotType::Cq | SpotType::Dx) {
        return Err(Rejection::WrongSpotType);
    }

    Ok(Spot {
        de: wire.de.clone(),
        dx: wire.dx.clone(),
        time: wire.recv_time_epoch_secs,
        snr: wire.snr,
        freq: wire.freq_khz,
        reference: is_reference,
        analyzed: false,
    })
}

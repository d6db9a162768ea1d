//! Activity monitor and counter-wrap guard (spec §4.6, §4.7).
//!
//! The monitor runs on a periodic sweep, independent of spot arrival: it
//! demotes bands (and transitively skimmers) that have gone quiet, and
//! maintains a smoothed spots-per-minute estimate per skimmer. The wrap
//! guard is a single check the streaming main loop runs against its
//! monotonic spot counter.

use std::collections::HashMap;
use tracing::debug;

use crate::config::EngineConfig;
use crate::skimmer::SkimmerTable;
use crate::window::SpotWindow;

/// Threshold past which the streaming main loop's spot counter is
/// considered at risk of overflow and must be reset (spec §4.7) — half of
/// `i64::MAX`, mirroring the original `LONG_MAX/2` guard.
pub const WRAP_THRESHOLD: i64 = i64::MAX / 2;

/// If `counter` has reached [`WRAP_THRESHOLD`], reset it: mark every
/// window slot analyzed and zero every skimmer's per-band counters while
/// retaining their learned averages (spec §4.7). Returns the counter's
/// new value, unchanged if no reset was needed.
pub fn guard_against_wrap(window: &mut SpotWindow, table: &mut SkimmerTable, counter: i64) -> i64 {
    if counter < WRAP_THRESHOLD {
        return counter;
    }
    debug!(counter, "spot counter nearing overflow, resetting");
    window.mark_all_analyzed();
    table.reset_counts_retain_averages();
    0
}

/// Smoothed spots-per-minute state for one skimmer, tracked across
/// sweeps (spec §4.6).
#[derive(Debug, Clone, Copy, Default)]
struct Snapshot {
    last_count: u64,
    spm: f64,
}

/// Periodic sweep that demotes idle bands and tracks spots-per-minute.
pub struct ActivityMonitor {
    sweep_interval_secs: i64,
    last_sweep: Option<i64>,
    snapshots: HashMap<String, Snapshot>,
}

impl ActivityMonitor {
    pub fn new(sweep_interval_secs: i64) -> Self {
        Self {
            sweep_interval_secs,
            last_sweep: None,
            snapshots: HashMap::new(),
        }
    }

    /// Whether a sweep is due at `now`.
    pub fn due(&self, now: i64) -> bool {
        match self.last_sweep {
            Some(last) => now - last >= self.sweep_interval_secs,
            None => true,
        }
    }

    /// Run one sweep over `table`:
    ///
    /// 1. For every band idle (by `last`) at least `config.max_inact_secs`,
    ///    demote it to inactive.
    /// 2. Recompute each skimmer's `active` as the OR of its bands.
    /// 3. Update the smoothed spots-per-minute estimate:
    ///    `spm <- (19 * spm + 60 * delta_count / delta_t) / 20`.
    ///
    /// A no-op if a sweep is not yet due.
    pub fn sweep(&mut self, table: &mut SkimmerTable, now: i64, config: &EngineConfig) {
        if !self.due(now) {
            return;
        }
        let delta_t = self
            .last_sweep
            .map(|last| (now - last).max(1))
            .unwrap_or(self.sweep_interval_secs)
            .max(1) as f64;

        for skimmer in table.iter_mut() {
            for band in &mut skimmer.bands {
                if band.active && now - band.last >= config.max_inact_secs {
                    band.active = false;
                }
            }
            skimmer.recompute_active();

            let total_count: u64 = skimmer.bands.iter().map(|b| b.count).sum();
            let snapshot = self.snapshots.entry(skimmer.call.clone()).or_default();
            let delta_count = total_count.saturating_sub(snapshot.last_count) as f64;
            snapshot.spm = (19.0 * snapshot.spm + 60.0 * delta_count / delta_t) / 20.0;
            snapshot.last_count = total_count;
        }

        self.last_sweep = Some(now);
    }

    /// Current smoothed spots-per-minute estimate for `call`, or 0 if
    /// unseen.
    pub fn spm(&self, call: &str) -> f64 {
        self.snapshots.get(call).map(|s| s.spm).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::Band;
    use crate::skimmer::CorrelationEvent;

    fn event(candidate: &str, t: i64) -> CorrelationEvent {
        CorrelationEvent {
            candidate: candidate.to_string(),
            candidate_is_reference: false,
            band: Band::B20m,
            delta_ppm: 1.0,
            timestamp: t,
            ref_freq_khz: 14000.0,
        }
    }

    #[test]
    fn test_wrap_guard_no_op_below_threshold() {
        let mut window = SpotWindow::new(4);
        let mut table = SkimmerTable::new(10);
        assert_eq!(guard_against_wrap(&mut window, &mut table, 100), 100);
    }

    #[test]
    fn test_wrap_guard_resets_at_threshold() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(4);
        let mut table = SkimmerTable::new(10);
        table.apply_streaming(&event("X", 1000), &config);

        let result = guard_against_wrap(&mut window, &mut table, WRAP_THRESHOLD);
        assert_eq!(result, 0);
        assert!(window.scan().all(|s| s.analyzed));
        let skimmer = table.get("X").unwrap();
        assert_eq!(skimmer.bands[Band::B20m.index()].count, 0);
        // Average is retained across the reset.
        assert!(skimmer.bands[Band::B20m.index()].avdev_ppm > 0.0);
    }

    #[test]
    fn test_sweep_demotes_idle_band() {
        let config = EngineConfig::default();
        let mut table = SkimmerTable::new(10);
        table.apply_streaming(&event("X", 0), &config);
        assert!(table.get("X").unwrap().active);

        let mut monitor = ActivityMonitor::new(15);
        monitor.sweep(&mut table, config.max_inact_secs + 100, &config);

        let skimmer = table.get("X").unwrap();
        assert!(!skimmer.bands[Band::B20m.index()].active);
        assert!(!skimmer.active);
    }

    #[test]
    fn test_sweep_demotes_band_exactly_at_inact_threshold() {
        // Property 7 (spec §8): demotion fires at `now - last >= max_inact_secs`,
        // not only strictly past it.
        let config = EngineConfig::default();
        let mut table = SkimmerTable::new(10);
        table.apply_streaming(&event("X", 0), &config);

        let mut monitor = ActivityMonitor::new(15);
        monitor.sweep(&mut table, config.max_inact_secs, &config);

        let skimmer = table.get("X").unwrap();
        assert!(!skimmer.bands[Band::B20m.index()].active);
        assert!(!skimmer.active);
    }

    #[test]
    fn test_sweep_not_due_is_noop() {
        let config = EngineConfig::default();
        let mut table = SkimmerTable::new(10);
        table.apply_streaming(&event("X", 0), &config);

        let mut monitor = ActivityMonitor::new(1000);
        monitor.sweep(&mut table, 5, &config);
        assert!(table.get("X").unwrap().active);
    }

    #[test]
    fn test_spm_tracks_rate() {
        let config = EngineConfig::default();
        let mut table = SkimmerTable::new(10);
        let mut monitor = ActivityMonitor::new(60);

        for i in 0..10 {
            table.apply_streaming(&event("X", i), &config);
        }
        monitor.sweep(&mut table, 60, &config);
        assert!(monitor.spm("X") > 0.0);
    }
}

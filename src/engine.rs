//! The streaming engine: glues the reference registry, spot window,
//! correlation engine, skimmer table, and activity monitor together into
//! one per-mode pipeline (spec §2 System Overview, §5 Concurrency Model —
//! "one well-factored streaming engine parameterized by mode, not
//! multiple binaries").
//!
//! `Engine` is pure logic: it consumes already-framed `(topic, frame)`
//! pairs and has no opinion about where they came from. The actual
//! publish/subscribe transport is out of scope (spec §1) and lives, if
//! anywhere, in a thin adapter that feeds [`Engine::handle_frame`].

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::activity::{self, ActivityMonitor};
use crate::config::EngineConfig;
use crate::correlator;
use crate::reference::{ReferenceRegistry, RefreshSchedule};
use crate::skimmer::SkimmerTable;
use crate::stats::SkimmerStats;
use crate::window::{self, SpotWindow};
use crate::wire;

/// The full streaming pipeline for one transmission mode.
pub struct Engine {
    config: EngineConfig,
    registry: ReferenceRegistry,
    refresh_schedule: RefreshSchedule,
    window: SpotWindow,
    table: SkimmerTable,
    activity: ActivityMonitor,
    stats: Arc<SkimmerStats>,
    spot_counter: i64,
}

/// Sweep cadence for the activity monitor (spec §4.6: "roughly every 15
/// seconds").
const ACTIVITY_SWEEP_INTERVAL_SECS: i64 = 15;

impl Engine {
    pub fn new(config: EngineConfig, registry: ReferenceRegistry, stats: Arc<SkimmerStats>) -> Self {
        let window = SpotWindow::new(config.spots_window);
        let table = SkimmerTable::new(config.max_skimmers);
        let refresh_schedule = RefreshSchedule::new(config.refupdhour, config.refupdminute);
        Self {
            window,
            table,
            refresh_schedule,
            activity: ActivityMonitor::new(ACTIVITY_SWEEP_INTERVAL_SECS),
            registry,
            stats,
            config,
            spot_counter: 0,
        }
    }

    /// Handle one `(topic, frame)` pair off the transport. Returns `true`
    /// if the frame was admitted. `now` is accepted for parity with
    /// [`Engine::run_maintenance`] even though spot timing is taken from
    /// the wire frame itself; reserved for future arrival-skew checks.
    pub fn handle_frame(&mut self, topic: &str, frame: &str, _now: i64) -> bool {
        if !wire::is_spot_topic(topic) {
            trace!(topic, "ignoring non-spot topic");
            return false;
        }

        let wire_spot = match wire::parse_frame(frame) {
            Ok(spot) => spot,
            Err(e) => {
                debug!(error = %e, frame, "dropping malformed frame");
                return false;
            }
        };

        let is_reference = self.registry.contains(&wire_spot.de);
        let spot = match window::admit(&wire_spot, is_reference, &self.config) {
            Ok(spot) => spot,
            Err(rejection) => {
                self.stats.record_rejection(rejection);
                return false;
            }
        };

        self.stats.record_admission();
        self.spot_counter += 1;
        self.spot_counter = activity::guard_against_wrap(
            &mut self.window,
            &mut self.table,
            self.spot_counter,
        );

        if spot.reference {
            let events = correlator::correlate(&mut self.window, &spot, &self.config);
            for event in &events {
                self.stats.record_correlation(event.delta_ppm);
                self.table.apply_streaming(event, &self.config);
            }
        }

        self.window.insert(spot.clone());

        self.stats.set_table_size(self.table.len());
        self.stats.set_registry_size(self.registry.len());
        true
    }

    /// Run periodic maintenance: the activity sweep and (when due) the
    /// reference registry refresh. `load_reference` is called to fetch a
    /// fresh registry only when the refresh schedule actually fires.
    pub fn run_maintenance(
        &mut self,
        now: i64,
        day: i64,
        hour: u32,
        minute: u32,
        load_reference: impl FnOnce() -> Option<ReferenceRegistry>,
    ) {
        self.activity.sweep(&mut self.table, now, &self.config);

        if self.refresh_schedule.should_refresh(day, hour, minute) {
            match load_reference() {
                Some(fresh) => {
                    debug!(size = fresh.len(), "refreshed reference registry");
                    self.registry.replace(fresh);
                }
                None => warn!("reference registry refresh fired but no data was available"),
            }
        }
    }

    pub fn table(&self) -> &SkimmerTable {
        &self.table
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }
}

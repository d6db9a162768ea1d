//! Engine operation statistics.
//!
//! Tracks spot admission/rejection counts, correlation throughput, and a
//! deviation-ppm distribution. This is engine-operation observability,
//! distinct from the periodic skew snapshot published for consumers
//! (`crate::snapshot`) — this module answers "is the engine healthy",
//! not "what is the current skew".

use hdrhistogram::Histogram;
use serde::Serialize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::window::Rejection;

/// Deviation-ppm histograms can't hold negative integers; spots rarely
/// deviate past a few hundred ppm, so shift by this much and clamp to
/// keep the histogram bounds small (mirrors the SNR offset trick used
/// elsewhere for the same reason).
const DEVIATION_OFFSET_PPM: i64 = 1000;
const DEVIATION_HISTOGRAM_MAX: u64 = 2000;

/// Thread-safe statistics collector for the correlation engine.
#[derive(Debug)]
pub struct SkimmerStats {
    pub admitted: AtomicU64,
    pub dropped_snr: AtomicU64,
    pub dropped_freq: AtomicU64,
    pub dropped_mode: AtomicU64,
    pub dropped_spot_type: AtomicU64,
    pub correlated: AtomicU64,

    deviation_histogram: RwLock<Histogram<u64>>,

    registry_size: AtomicU64,
    table_size: AtomicU64,

    start_time: Instant,
}

impl SkimmerStats {
    pub fn new() -> Self {
        Self {
            admitted: AtomicU64::new(0),
            dropped_snr: AtomicU64::new(0),
            dropped_freq: AtomicU64::new(0),
            dropped_mode: AtomicU64::new(0),
            dropped_spot_type: AtomicU64::new(0),
            correlated: AtomicU64::new(0),
            deviation_histogram: RwLock::new(
                Histogram::new_with_bounds(1, DEVIATION_HISTOGRAM_MAX, 3)
                    .expect("failed to create deviation histogram"),
            ),
            registry_size: AtomicU64::new(0),
            table_size: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_admission(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::SnrTooLow => &self.dropped_snr,
            Rejection::FreqTooLow => &self.dropped_freq,
            Rejection::WrongMode => &self.dropped_mode,
            Rejection::WrongSpotType => &self.dropped_spot_type,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correlation(&self, delta_ppm: f64) {
        self.correlated.fetch_add(1, Ordering::Relaxed);
        let shifted = (delta_ppm + DEVIATION_OFFSET_PPM as f64).max(0.0) as u64;
        if let Ok(mut hist) = self.deviation_histogram.write() {
            let _ = hist.record(shifted.clamp(1, DEVIATION_HISTOGRAM_MAX));
        }
    }

    pub fn set_registry_size(&self, size: usize) {
        self.registry_size.store(size as u64, Ordering::Relaxed);
    }

    pub fn set_table_size(&self, size: usize) {
        self.table_size.store(size as u64, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn summary(&self) -> StatsSummary {
        let deviation_percentiles = self
            .deviation_histogram
            .read()
            .map(|h| HistogramPercentiles {
                p50: h.value_at_quantile(0.50) as i64 - DEVIATION_OFFSET_PPM,
                p90: h.value_at_quantile(0.90) as i64 - DEVIATION_OFFSET_PPM,
                p99: h.value_at_quantile(0.99) as i64 - DEVIATION_OFFSET_PPM,
                min: h.min() as i64 - DEVIATION_OFFSET_PPM,
                max: h.max() as i64 - DEVIATION_OFFSET_PPM,
                mean: h.mean() - DEVIATION_OFFSET_PPM as f64,
            })
            .ok();

        StatsSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            admitted: self.admitted.load(Ordering::Relaxed),
            dropped_snr: self.dropped_snr.load(Ordering::Relaxed),
            dropped_freq: self.dropped_freq.load(Ordering::Relaxed),
            dropped_mode: self.dropped_mode.load(Ordering::Relaxed),
            dropped_spot_type: self.dropped_spot_type.load(Ordering::Relaxed),
            correlated: self.correlated.load(Ordering::Relaxed),
            registry_size: self.registry_size.load(Ordering::Relaxed),
            table_size: self.table_size.load(Ordering::Relaxed),
            deviation_percentiles,
        }
    }
}

impl Default for SkimmerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile values from a histogram, shifted back to their real scale.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramPercentiles {
    pub p50: i64,
    pub p90: i64,
    pub p99: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// Summary of collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub elapsed_secs: f64,
    pub admitted: u64,
    pub dropped_snr: u64,
    pub dropped_freq: u64,
    pub dropped_mode: u64,
    pub dropped_spot_type: u64,
    pub correlated: u64,
    pub registry_size: u64,
    pub table_size: u64,
    pub deviation_percentiles: Option<HistogramPercentiles>,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "                  SKEW ENGINE STATISTICS")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Runtime: {:.1}s", self.elapsed_secs)?;
        writeln!(f, "Admitted: {}", self.admitted)?;
        writeln!(
            f,
            "Dropped: snr={} freq={} mode={} spot_type={}",
            self.dropped_snr, self.dropped_freq, self.dropped_mode, self.dropped_spot_type
        )?;
        writeln!(f, "Correlated: {}", self.correlated)?;
        writeln!(f, "Reference registry size: {}", self.registry_size)?;
        writeln!(f, "Skimmer table size: {}", self.table_size)?;
        writeln!(f)?;

        if let Some(ref p) = self.deviation_percentiles {
            writeln!(f, "Deviation Distribution (ppm):")?;
            writeln!(f, "  Min: {}, Max: {}, Mean: {:.2}", p.min, p.max, p.mean)?;
            writeln!(f, "  P50: {}, P90: {}, P99: {}", p.p50, p.p90, p.p99)?;
        }

        Ok(())
    }
}

//! Correlation engine: matches a newly admitted reference spot against the
//! spot window to estimate candidate skimmers' frequency deviation (spec
//! §4.4).

use tracing::trace;

use crate::band;
use crate::config::EngineConfig;
use crate::skimmer::CorrelationEvent;
use crate::spot::Spot;
use crate::window::SpotWindow;

/// Scan `window` for candidate spots that correlate with `reference_spot`
/// (spec §4.4 predicates, evaluated in order):
///
/// 1. the candidate slot is unanalyzed
/// 2. `candidate.dx == reference.dx`
/// 3. `|candidate.freq - reference.freq| <= max_err_khz`
/// 4. `|ppm deviation| < max_err_ppm`
/// 5. `candidate.de != reference.de` (self-exclusion)
/// 6. `|candidate.time - reference.time| <= max_apart_secs`
///
/// Every matching slot is flipped `analyzed = true` exactly once and
/// yields one [`CorrelationEvent`]. The band is derived from the
/// reference spot's own frequency (spec §4.4) — if it falls outside every
/// recognized allocation the reference spot correlates with nothing.
pub fn correlate(
    window: &mut SpotWindow,
    reference_spot: &Spot,
    config: &EngineConfig,
) -> Vec<CorrelationEvent> {
    let Some(band) = band::classify(reference_spot.freq) else {
        trace!(freq = reference_spot.freq, "reference spot has no known band");
        return Vec::new();
    };

    let mut events = Vec::new();
    for candidate in window.scan_mut() {
        if candidate.analyzed {
            continue;
        }
        if candidate.dx != reference_spot.dx {
            continue;
        }
        if (candidate.freq - reference_spot.freq).abs() > config.max_err_khz {
            continue;
        }
        let ppm_diff = (candidate.freq - reference_spot.freq) / reference_spot.freq * 1_000_000.0;
        if ppm_diff.abs() >= config.max_err_ppm {
            continue;
        }
        if candidate.de == reference_spot.de {
            continue;
        }
        if (candidate.time - reference_spot.time).abs() > config.max_apart_secs {
            continue;
        }

        candidate.analyzed = true;
        events.push(CorrelationEvent {
            candidate: candidate.de.clone(),
            candidate_is_reference: candidate.reference,
            band,
            delta_ppm: ppm_diff,
            timestamp: candidate.time,
            ref_freq_khz: reference_spot.freq,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(de: &str, dx: &str, freq: f64, time: i64, reference: bool) -> Spot {
        Spot {
            de: de.to_string(),
            dx: dx.to_string(),
            time,
            snr: 20,
            freq,
            reference,
            analyzed: false,
        }
    }

    #[test]
    fn test_correlate_basic_match() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "AA1A", 14020.001, 1005, false));

        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);
        let events = correlate(&mut window, &reference, &config);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].candidate, "W2CAND");
        assert_eq!(events[0].band, band::Band::B20m);
    }

    #[test]
    fn test_correlate_marks_analyzed() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "AA1A", 14020.001, 1005, false));
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        correlate(&mut window, &reference, &config);
        assert!(window.scan().all(|s| s.analyzed));
    }

    #[test]
    fn test_correlate_rejects_different_dx() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "BB2B", 14020.001, 1005, false));
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }

    #[test]
    fn test_correlate_rejects_large_freq_diff() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "AA1A", 14021.0, 1005, false));
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }

    #[test]
    fn test_correlate_rejects_self_de() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W1REF", "AA1A", 14020.001, 1005, false));
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }

    #[test]
    fn test_correlate_rejects_too_far_apart_in_time() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "AA1A", 14020.001, 2000, false));
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }

    #[test]
    fn test_correlate_skips_already_analyzed_slot() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        let mut already = spot("W2CAND", "AA1A", 14020.001, 1005, false);
        already.analyzed = true;
        window.insert(already);
        let reference = spot("W1REF", "AA1A", 14020.000, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }

    #[test]
    fn test_correlate_unknown_band_yields_nothing() {
        let config = EngineConfig::default();
        let mut window = SpotWindow::new(8);
        window.insert(spot("W2CAND", "AA1A", 999.0, 1005, false));
        let reference = spot("W1REF", "AA1A", 999.0, 1000, true);

        assert!(correlate(&mut window, &reference, &config).is_empty());
    }
}

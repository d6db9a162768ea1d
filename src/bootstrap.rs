//! Batch bootstrap analyzer: derives a reference set from a historical
//! spot archive in two passes (spec §4.8).
//!
//! The on-disk archive *format itself* is out of scope for storage
//! concerns (spec §1 Non-goals name the batch archive format as
//! out-of-scope for the transport layer), but the CSV schema must still
//! be parsed here, since the bootstrap analyzer's whole job is reading
//! it: `callsign,de_pfx,de_cont,freq,band,dx,dx_pfx,dx_cont,mode,db,date,speed,tx_mode`,
//! with `date` in `%Y-%m-%d %H:%M:%S`.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::band::Band;
use crate::config::EngineConfig;
use crate::correlator;
use crate::reference::ReferenceRegistry;
use crate::skimmer::{Skimmer, SkimmerTable};
use crate::spot::{Mode, Spot};
use crate::window::SpotWindow;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors parsing one line of the historical archive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("expected 13 comma-delimited fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),
    #[error("invalid db: {0}")]
    InvalidDb(String),
    #[error("invalid date {0:?}: does not match %Y-%m-%d %H:%M:%S")]
    InvalidDate(String),
}

/// One parsed row of the historical archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub callsign: String,
    pub freq: f64,
    pub dx: String,
    pub mode: Option<Mode>,
    pub db: i32,
    pub time: i64,
}

/// Parse one CSV line of the archive:
/// `callsign,de_pfx,de_cont,freq,band,dx,dx_pfx,dx_cont,mode,db,date,speed,tx_mode`.
/// Only the fields the correlation pipeline needs are kept; the rest
/// (prefix/continent breakdowns, nominal band, speed, tx_mode) are
/// positional filler the original archive carries but this analyzer has
/// no use for.
pub fn parse_csv_line(line: &str) -> Result<ArchiveRecord, ArchiveError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 13 {
        return Err(ArchiveError::WrongFieldCount(fields.len()));
    }

    let callsign = fields[0].to_string();
    let freq: f64 = fields[3]
        .parse()
        .map_err(|_| ArchiveError::InvalidFrequency(fields[3].to_string()))?;
    let dx = fields[5].to_string();
    let mode = Mode::parse(fields[8]);
    let db: i32 = fields[9]
        .parse()
        .map_err(|_| ArchiveError::InvalidDb(fields[9].to_string()))?;
    let time = NaiveDateTime::parse_from_str(fields[10], TIME_FORMAT)
        .map_err(|_| ArchiveError::InvalidDate(fields[10].to_string()))?
        .and_utc()
        .timestamp();

    Ok(ArchiveRecord {
        callsign,
        freq,
        dx,
        mode,
        db,
        time,
    })
}

/// Options controlling a bootstrap run, beyond the engine's tunables.
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Restrict the final report to a single callsign (`-t`).
    pub target: Option<String>,
    /// Sort the report by deviation; `Some(true)` worst-first (`-h`),
    /// `Some(false)` best-first (`-s`), `None` unsorted (table order).
    pub sort_worst_first: Option<bool>,
}

/// Feed `records` (assumed time-ordered) through the admission and
/// correlation pipeline exactly as the streaming engine would, using
/// `anchors` as the reference registry and accumulating ratios rather
/// than running the IIR filter (spec §4.8 one pass).
fn run_pass(records: &[ArchiveRecord], anchors: &ReferenceRegistry, config: &EngineConfig) -> SkimmerTable {
    let mut window = SpotWindow::new(config.spots_window);
    let mut table = SkimmerTable::new(config.max_skimmers);

    for record in records {
        if record.db < config.min_snr || record.freq < config.min_freq_khz {
            continue;
        }
        if record.mode != Some(config.mode) {
            continue;
        }
        let is_reference = anchors.contains(&record.callsign);
        let spot = Spot {
            de: record.callsign.clone(),
            dx: record.dx.clone(),
            time: record.time,
            snr: record.db,
            freq: record.freq,
            reference: is_reference,
            analyzed: false,
        };
        // The CSV archive carries no spot-type column; every admitted
        // historical row is treated as if it passed that admission gate
        // already (spec's SpotType::Cq/Dx gate only applies to the live
        // wire format).
        if is_reference {
            let events = correlator::correlate(&mut window, &spot, config);
            for event in events {
                // event.delta_ppm carries (candidate - ref)/ref * 1e6;
                // recover the plain ratio candidate_freq / ref_freq for
                // the accadj accumulator (spec §4.8 pass 1).
                let candidate_ratio = 1.0 + event.delta_ppm / 1_000_000.0;
                table.apply_batch(
                    &event.candidate,
                    event.candidate_is_reference,
                    event.band,
                    candidate_ratio,
                    event.timestamp,
                );
            }
        }

        window.insert(spot);
    }
    table
}

/// Consolidated batch-mode deviation for one skimmer: sum `accadj` across
/// bands from the highest index down, including lower bands only until at
/// least one has contributed, divide by the corresponding summed counts,
/// and convert to ppm (spec §4.8 point 1). Returns `None` if the skimmer
/// has no qualified spots at all.
pub fn consolidated_batch_deviation_ppm(skimmer: &Skimmer) -> Option<f64> {
    let mut accadj_sum = 0.0;
    let mut count_sum = 0u64;
    for band in Band::ALL.iter().rev() {
        let state = &skimmer.bands[band.index()];
        if state.count == 0 {
            continue;
        }
        accadj_sum += state.accadj;
        count_sum += state.count;
        break;
    }
    if count_sum == 0 {
        return None;
    }
    Some((accadj_sum / count_sum as f64 - 1.0) * 1_000_000.0)
}

/// Quality metric, 0..9, scaling logarithmically with qualified-spot
/// count (spec §4.8): `min(9, floor(9 * log10(count) / log10(2000)))`.
pub fn quality(count: u64) -> u8 {
    if count == 0 {
        return 0;
    }
    let raw = 9.0 * (count as f64).log10() / 2000f64.log10();
    raw.floor().clamp(0.0, 9.0) as u8
}

/// Build the regenerated reference-file text from `table`, grouped under
/// comment headers by deviation tier (spec §4.8): `< 0.1 ppm`, `< 0.2
/// ppm`, `< 0.3 ppm`, only considering skimmers with at least
/// `min_ref_spots` qualified spots.
pub fn render_reference_file(table: &SkimmerTable, min_ref_spots: u32) -> String {
    let tiers: [(f64, &str); 3] = [(0.1, "< 0.1 ppm"), (0.2, "< 0.2 ppm"), (0.3, "< 0.3 ppm")];
    let mut out = String::new();

    let mut remaining: Vec<&Skimmer> = table
        .iter()
        .filter(|s| {
            let count: u64 = s.bands.iter().map(|b| b.count).sum();
            count >= min_ref_spots as u64 && consolidated_batch_deviation_ppm(s).is_some()
        })
        .collect();

    for (limit, label) in tiers {
        let mut calls: Vec<&Skimmer> = Vec::new();
        remaining.retain(|s| {
            let dev = consolidated_batch_deviation_ppm(s).expect("filtered above");
            if dev.abs() < limit {
                calls.push(s);
                false
            } else {
                true
            }
        });
        if calls.is_empty() {
            continue;
        }
        calls.sort_by(|a, b| a.call.cmp(&b.call));
        out.push_str(&format!("# {label}\n"));
        for skimmer in calls {
            out.push_str(&skimmer.call);
            out.push('\n');
        }
    }
    out
}

/// One row of the final human-readable report (spec §6 supplemented
/// targeted/sorted reporting, grounded in the original `-t`/`-s`/`-h`
/// batch-mode flags).
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub call: String,
    pub reference: bool,
    pub deviation_ppm: Option<f64>,
    pub count: u64,
    pub quality: u8,
}

/// The final, reportable output of a bootstrap run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn from_table(table: &SkimmerTable, options: &BootstrapOptions) -> Self {
        let mut rows: Vec<ReportRow> = table
            .iter()
            .filter(|s| match &options.target {
                Some(target) => &s.call == target,
                None => true,
            })
            .map(|s| {
                let count: u64 = s.bands.iter().map(|b| b.count).sum();
                ReportRow {
                    call: s.call.clone(),
                    reference: s.reference,
                    deviation_ppm: consolidated_batch_deviation_ppm(s),
                    count,
                    quality: quality(count),
                }
            })
            .collect();

        rows.sort_by(|a, b| a.call.cmp(&b.call));
        if let Some(worst_first) = options.sort_worst_first {
            rows.sort_by(|a, b| {
                let da = a.deviation_ppm.unwrap_or(0.0).abs();
                let db = b.deviation_ppm.unwrap_or(0.0).abs();
                if worst_first {
                    db.partial_cmp(&da).unwrap()
                } else {
                    da.partial_cmp(&db).unwrap()
                }
            });
        }

        Self { rows }
    }

    /// Fixed-width table, in the style of the original human-readable
    /// per-band summary report.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<12}{:<5}{:>10}{:>8}{:>4}\n",
            "CALL", "REF", "DEV(ppm)", "COUNT", "Q"
        ));
        for row in &self.rows {
            let dev = row
                .deviation_ppm
                .map(|d| format!("{d:.3}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "{:<12}{:<5}{:>10}{:>8}{:>4}\n",
                row.call,
                if row.reference { "Y" } else { "" },
                dev,
                row.count,
                row.quality
            ));
        }
        out
    }
}

/// Run the full two-pass bootstrap (spec §4.8):
///
/// 1. Pass 1, using `anchors` as the reference set, accumulates
///    `accadj`/`count` per skimmer per band.
/// 2. The reference file is regenerated from pass 1's results.
/// 3. Pass 2 replays every record with the regenerated reference set,
///    producing the final table the report is built from.
pub fn run_two_pass(
    records: &[ArchiveRecord],
    anchors: &ReferenceRegistry,
    config: &EngineConfig,
) -> (SkimmerTable, String) {
    let pass1 = run_pass(records, anchors, config);
    let reference_file = render_reference_file(&pass1, config.min_ref_spots);

    // The regenerated file only lists stations *measured against* the
    // anchors (an anchor is never its own candidate). The anchors remain
    // trusted truth, so pass 2's registry is anchors plus whatever newly
    // qualified (spec §8 S6: "reference file ... contains B ... pass 2
    // then permits C to be measured against both A and B").
    let mut combined_text = String::new();
    for call in anchors.iter() {
        combined_text.push_str(call);
        combined_text.push('\n');
    }
    combined_text.push_str(&reference_file);
    let derived = ReferenceRegistry::parse(&combined_text, config.max_ref);

    let pass2 = run_pass(records, &derived, config);
    (pass2, reference_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_line(callsign: &str, freq: f64, dx: &str, db: i32, date: &str) -> String {
        format!("{callsign},W,NA,{freq},20m,{dx},K,NA,CW,{db},{date},25,CW")
    }

    #[test]
    fn test_parse_csv_line() {
        let line = csv_line("W1REF", 14020.0, "AA1A", 20, "2026-01-01 12:00:00");
        let record = parse_csv_line(&line).unwrap();
        assert_eq!(record.callsign, "W1REF");
        assert_eq!(record.dx, "AA1A");
        assert_eq!(record.db, 20);
        assert_eq!(record.mode, Some(Mode::Cw));
    }

    #[test]
    fn test_parse_csv_line_bad_date() {
        let line = csv_line("W1REF", 14020.0, "AA1A", 20, "not-a-date");
        assert!(matches!(parse_csv_line(&line), Err(ArchiveError::InvalidDate(_))));
    }

    #[test]
    fn test_parse_csv_line_wrong_field_count() {
        assert!(matches!(
            parse_csv_line("a,b,c"),
            Err(ArchiveError::WrongFieldCount(3))
        ));
    }

    #[test]
    fn test_quality_scales_with_count() {
        assert_eq!(quality(0), 0);
        assert_eq!(quality(2000), 9);
        assert!(quality(150) < quality(2000));
    }

    #[test]
    fn test_run_two_pass_produces_reference_file_and_report() {
        let config = EngineConfig {
            min_ref_spots: 2,
            ..EngineConfig::default()
        };
        let mut anchors_text = String::new();
        anchors_text.push_str("W1REF\n");
        let anchors = ReferenceRegistry::parse(&anchors_text, config.max_ref);

        let mut records = Vec::new();
        for i in 0..5 {
            let t = format!("2026-01-01 12:00:{:02}", i);
            records.push(parse_csv_line(&csv_line("W1REF", 14020.000, "AA1A", 20, &t)).unwrap());
            records.push(parse_csv_line(&csv_line("W2CAND", 14020.001, "AA1A", 20, &t)).unwrap());
        }

        let (table, reference_file) = run_two_pass(&records, &anchors, &config);
        assert!(table.get("W2CAND").is_some());
        assert!(reference_file.contains("ppm"));

        let report = Report::from_table(&table, &BootstrapOptions::default());
        assert!(report.rows.iter().any(|r| r.call == "W2CAND"));
        let rendered = report.render_table();
        assert!(rendered.contains("CALL"));
    }

    #[test]
    fn test_report_targeted_filters_to_one_callsign() {
        let config = EngineConfig {
            min_ref_spots: 1,
            ..EngineConfig::default()
        };
        let mut table = SkimmerTable::new(10);
        table.apply_batch("W2CAND", false, Band::B20m, 1.0001, 1000);
        table.apply_batch("W3OTHER", false, Band::B20m, 1.0002, 1000);

        let options = BootstrapOptions {
            target: Some("W2CAND".to_string()),
            ..Default::default()
        };
        let report = Report::from_table(&table, &options);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].call, "W2CAND");
        let _ = config;
    }

    #[test]
    fn test_report_sorted_worst_first() {
        let mut table = SkimmerTable::new(10);
        table.apply_batch("GOOD", false, Band::B20m, 1.00005, 1000);
        table.apply_batch("BAD", false, Band::B20m, 1.0005, 1000);

        let options = BootstrapOptions {
            sort_worst_first: Some(true),
            ..Default::default()
        };
        let report = Report::from_table(&table, &options);
        assert_eq!(report.rows[0].call, "BAD");
    }

    #[test]
    fn test_run_pass_correlates_before_evicting_candidate_from_window() {
        // Regression: mirrors the streaming-engine ordering bug — a
        // capacity-2 window wraps back to the candidate's slot on the
        // reference spot's insert, so the candidate must be scanned
        // before it is overwritten.
        let config = EngineConfig {
            spots_window: 2,
            ..EngineConfig::default()
        };
        let anchors = ReferenceRegistry::parse("W1REF\n", config.max_ref);

        let records = vec![
            parse_csv_line(&csv_line("W2CAND", 14020.001, "AA1A", 20, "2026-01-01 12:00:00")).unwrap(),
            parse_csv_line(&csv_line("W3OTHER", 7018.0, "N0CALL", 20, "2026-01-01 12:00:00")).unwrap(),
            parse_csv_line(&csv_line("W1REF", 14020.000, "AA1A", 20, "2026-01-01 12:00:01")).unwrap(),
        ];

        let table = run_pass(&records, &anchors, &config);
        assert!(table.get("W2CAND").is_some());
    }

    #[test]
    fn test_render_reference_file_places_each_skimmer_in_one_tier_only() {
        let mut table = SkimmerTable::new(10);
        // avdev ~0.05 ppm, qualifies for all three tiers.
        for _ in 0..200 {
            table.apply_batch("TIGHT", false, Band::B20m, 1.00000005, 1000);
        }

        let rendered = render_reference_file(&table, 100);
        let occurrences = rendered.lines().filter(|l| *l == "TIGHT").count();
        assert_eq!(occurrences, 1, "rendered file:\n{rendered}");
        assert!(rendered.contains("< 0.1 ppm"));
        assert!(!rendered.contains("< 0.2 ppm"));
        assert!(!rendered.contains("< 0.3 ppm"));
    }
}

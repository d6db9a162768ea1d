//! Snapshot / publication shape (spec §4.9).
//!
//! Building the JSON value itself is in scope; the framing and transport
//! used to publish it are not (spec §1 Non-goals: "JSON publication
//! transport framing"). The shape intentionally does not reproduce the
//! missing-comma bug present in the original emitter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::band::Band;
use crate::bootstrap::quality;
use crate::skimmer::Skimmer;

/// Deviation summary for one band or for the consolidated 24h figure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BandSkew {
    pub skew: f64,
    pub qual: u8,
    pub count: u64,
}

/// One skimmer's published snapshot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub node: String,
    #[serde(rename = "ref")]
    pub reference: bool,
    pub time: i64,
    #[serde(rename = "24h_skew")]
    pub skew_24h: BandSkew,
    #[serde(rename = "24h_per_band")]
    pub per_band: BTreeMap<String, BandSkew>,
}

/// Build a snapshot for `skimmer`, or `None` if it currently has no
/// active band to report on (spec §4.9: only active skimmers publish).
pub fn build_snapshot(skimmer: &Skimmer, now: i64) -> Option<Snapshot> {
    if !skimmer.active {
        return None;
    }

    let mut per_band = BTreeMap::new();
    for band in Band::ALL {
        let state = &skimmer.bands[band.index()];
        if !state.active {
            continue;
        }
        per_band.insert(
            band.name().to_string(),
            BandSkew {
                skew: state.avdev_ppm,
                qual: quality(state.count),
                count: state.count,
            },
        );
    }
    if per_band.is_empty() {
        return None;
    }

    let total_count: u64 = skimmer.bands.iter().filter(|b| b.active).map(|b| b.count).sum();
    let skew_24h = BandSkew {
        skew: skimmer.avdev_ppm,
        qual: quality(total_count),
        count: total_count,
    };

    Some(Snapshot {
        node: skimmer.call.clone(),
        reference: skimmer.reference,
        time: now,
        skew_24h,
        per_band,
    })
}

/// Build snapshots for every currently-active skimmer in `table`.
pub fn build_all<'a>(
    table: impl Iterator<Item = &'a Skimmer>,
    now: i64,
) -> Vec<Snapshot> {
    table.filter_map(|s| build_snapshot(s, now)).collect()
}

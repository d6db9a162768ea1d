//! Parser for the spot-stream wire frame (spec §6).
//!
//! The transport itself — the publish/subscribe socket that delivers these
//! frames — is out of scope (spec §1): it is treated as an opaque
//! byte-frame source. What is in scope is turning frame 2 of an accepted
//! `PROD_SPOT*` message into a [`WireSpot`]:
//!
//! ```text
//! freq_kHz | dx | de | spot_type | base_freq | snr | speed | mode | ntp | jstime_sent_ms | jstime_recv_ms | extradata
//! ```
//!
//! Exactly 12 pipe-delimited fields are required; anything else is a
//! parse-recoverable error (spec §7) and the record is dropped.

use nom::{
    IResult, Parser,
    bytes::complete::is_not,
    character::complete::char,
    multi::separated_list1,
};
use thiserror::Error;

use crate::spot::{Mode, SpotType};

/// Errors that can occur while parsing a wire frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 12 pipe-delimited fields, found {0}")]
    WrongFieldCount(usize),

    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("invalid SNR: {0}")]
    InvalidSnr(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("invalid recv timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unrecognized topic frame")]
    UnrecognizedTopic,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A spot as received over the wire, before the admission policy (§4.3)
/// decides whether it enters the window.
#[derive(Debug, Clone, PartialEq)]
pub struct WireSpot {
    pub freq_khz: f64,
    pub dx: String,
    pub de: String,
    pub spot_type: SpotType,
    pub snr: i32,
    pub mode: Option<Mode>,
    /// `jstime_recv_ms / 1000`, per spec §6.
    pub recv_time_epoch_secs: i64,
}

/// Check whether a topic frame (frame 1 of a two-frame message) is a spot
/// topic we should parse frame 2 of.
pub fn is_spot_topic(topic: &str) -> bool {
    topic.starts_with("PROD_SPOT")
}

/// Split frame 2 on `|`, tolerating an empty trailing field (e.g. a bare
/// trailing `|` before `extradata`).
fn split_fields(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('|'), is_not("|")).parse(input)
}

/// Parse frame 2 of a spot-stream message into a [`WireSpot`].
///
/// Returns `Err` for any malformed record (wrong field count, or a field
/// that fails to parse as its expected type) — spec §6: "malformed
/// records are dropped".
pub fn parse_frame(frame: &str) -> ParseResult<WireSpot> {
    // `separated_list1` only fails to match on a totally empty/degenerate
    // input (e.g. "" or a run of bare pipes); fall back to a plain split
    // so the reported count still reflects what was actually there.
    let raw_fields: Vec<&str> = match split_fields(frame) {
        Ok((_, fields)) => fields,
        Err(_) => frame.split('|').collect(),
    };
    let fields: Vec<&str> = raw_fields.iter().map(|f| f.trim()).collect();
    if fields.len() != 12 {
        return Err(ParseError::WrongFieldCount(fields.len()));
    }

    let freq_khz: f64 = fields[0]
        .parse()
        .map_err(|_| ParseError::InvalidFrequency(fields[0].to_string()))?;
    let dx = fields[1].to_string();
    let de = fields[2].to_string();
    let spot_type = SpotType::parse(fields[3]);
    // fields[4] = base_freq, unused by the correlation engine.
    let snr: i32 = fields[5]
        .parse()
        .map_err(|_| ParseError::InvalidSnr(fields[5].to_string()))?;
    // fields[6] = speed, unused.
    let mode = Mode::parse(fields[7]);
    // fields[8] = ntp, fields[9] = jstime_sent_ms, unused.
    let jstime_recv_ms: i64 = fields[10]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(fields[10].to_string()))?;

    Ok(WireSpot {
        freq_khz,
        dx,
        de,
        spot_type,
        snr,
        mode,
        recv_time_epoch_secs: jstime_recv_ms / 1000,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> String {
        "14020.00|AA1A|W6JSV-#|CQ|14020|20|25|CW|1|1700000000000|1700000000500|extra".to_string()
    }

    #[test]
    fn test_is_spot_topic() {
        assert!(is_spot_topic("PROD_SPOT"));
        assert!(is_spot_topic("PROD_SPOT_CW"));
        assert!(!is_spot_topic("SKEW_TEST_24H"));
    }

    #[test]
    fn test_parse_frame_basic() {
        let spot = parse_frame(&sample_frame()).expect("should parse");
        assert_eq!(spot.dx, "AA1A");
        assert_eq!(spot.de, "W6JSV-#");
        assert_eq!(spot.spot_type, SpotType::Cq);
        assert_eq!(spot.snr, 20);
        assert_eq!(spot.mode, Some(Mode::Cw));
        assert_eq!(spot.recv_time_epoch_secs, 1_700_000_000);
    }

    #[test]
    fn test_wrong_field_count() {
        let bad = "14020.00|AA1A|W6JSV-#|CQ";
        assert_eq!(parse_frame(bad), Err(ParseError::WrongFieldCount(4)));
    }

    #[test]
    fn test_empty_frame_reports_accurate_field_count() {
        assert_eq!(parse_frame(""), Err(ParseError::WrongFieldCount(1)));
    }

    #[test]
    fn test_invalid_frequency() {
        let bad = "notafreq|AA1A|W6JSV-#|CQ|14020|20|25|CW|1|1700000000000|1700000000500|extra";
        assert!(matches!(
            parse_frame(bad),
            Err(ParseError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_unknown_mode_is_none_not_error() {
        let ft8 = "14020.00|AA1A|W6JSV-#|CQ|14020|20|25|FT8|1|1700000000000|1700000000500|extra";
        let spot = parse_frame(ft8).expect("should parse despite unknown mode");
        assert_eq!(spot.mode, None);
    }
}

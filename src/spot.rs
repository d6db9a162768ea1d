//! Core data model: the spot record the engine operates on (spec §3).
//!
//! A [`Spot`] is the value type captured in the sliding window. It is
//! produced from a [`crate::wire::WireSpot`] by the admission policy
//! (§4.3) and is otherwise immutable except for its `analyzed` flag, which
//! the correlation engine flips exactly once (§4.4, §8 property 1).

use serde::{Deserialize, Serialize};

/// Transmission mode of a spot. An engine instance admits only one mode
/// at a time (CW or RTTY, selected at construction — §6, `-r`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Cw,
    Rtty,
}

impl Mode {
    fn as_wire_str(self) -> &'static str {
        match self {
            Mode::Cw => "CW",
            Mode::Rtty => "RTTY",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            s if s.eq_ignore_ascii_case("CW") => Some(Mode::Cw),
            s if s.eq_ignore_ascii_case("RTTY") => Some(Mode::Rtty),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

/// The kind of activity a spot reports (§4.3 admission policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpotType {
    /// Standard CQ call.
    Cq,
    /// A directed spot of a DX station (not a CQ).
    Dx,
    /// Anything else (beacons, NCDXF, etc.) — never admitted to the window.
    Other,
}

impl SpotType {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            s if s.eq_ignore_ascii_case("CQ") => SpotType::Cq,
            s if s.eq_ignore_ascii_case("DX") => SpotType::Dx,
            _ => SpotType::Other,
        }
    }
}

/// A single accepted spot, as captured in the sliding window (spec §3).
///
/// `analyzed` starts `false` for a live spot. The ring buffer's
/// uninitialized slots are a sentinel [`Spot`] with `analyzed = true`
/// so the scan predicate (§4.4) skips them without a separate "is this
/// slot live" check (§9).
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// Receiver callsign ("de" in the wire format).
    pub de: String,
    /// Spotted transmitter callsign ("dx").
    pub dx: String,
    /// Epoch seconds the spot was received.
    pub time: i64,
    /// Signal-to-noise ratio in dB.
    pub snr: i32,
    /// Frequency in kHz (fractional).
    pub freq: f64,
    /// Whether `de` was a member of the reference set at capture time.
    pub reference: bool,
    /// Whether this spot has already contributed to a correlation.
    pub analyzed: bool,
}

impl Spot {
    /// Build the sentinel spot that fills an uninitialized window slot:
    /// `analyzed = true` so it is never matched, and otherwise inert.
    pub fn sentinel() -> Self {
        Self {
            de: String::new(),
            dx: String::new(),
            time: 0,
            snr: 0,
            freq: 0.0,
            reference: false,
            analyzed: true,
        }
    }
}

//! Reference registry: the set of callsigns treated as frequency truth
//! (spec §4.2).

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors loading a reference (or anchor) file.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A set of callsigns treated as authoritative frequency truth, refreshed
/// wholesale from a text file.
///
/// File format (spec §6): one callsign per line, the first
/// whitespace-delimited token on the line; lines whose first non-whitespace
/// character is `#` are comments. Reading stops at `max_entries` and logs
/// a warning (spec §4.2, §7 capacity-overflow).
#[derive(Debug, Default, Clone)]
pub struct ReferenceRegistry {
    calls: HashSet<String>,
}

impl ReferenceRegistry {
    /// An empty registry, matching nothing.
    pub fn empty() -> Self {
        Self {
            calls: HashSet::new(),
        }
    }

    /// Load a registry from a reference/anchor file, honoring `max_entries`
    /// (spec §4.2 "Overflow past a fixed capacity stops reading at that
    /// point and logs a warning" — this is not fatal, unlike a missing
    /// file on startup).
    pub fn load(path: impl AsRef<Path>, max_entries: usize) -> Result<Self, ReferenceError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|source| ReferenceError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&content, max_entries))
    }

    /// Parse registry content directly (used by `load` and by tests/the
    /// bootstrap analyzer, which regenerates and immediately re-reads a
    /// reference file in memory).
    pub fn parse(content: &str, max_entries: usize) -> Self {
        let mut calls = HashSet::new();
        for line in content.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some(call) = trimmed.split_whitespace().next() else {
                continue;
            };
            if calls.len() >= max_entries {
                warn!(
                    max_entries,
                    "reference registry overflow; ignoring remaining entries"
                );
                break;
            }
            calls.insert(call.to_string());
        }
        Self { calls }
    }

    /// Atomically replace the in-memory set with `other` (spec §3
    /// "fully replaced atomically on refresh" — atomic in the sense that
    /// callers never observe a partially-updated set; see
    /// [`crate::reference::Refresher`] for the thread-confined single
    /// assignment that realizes this).
    pub fn replace(&mut self, other: ReferenceRegistry) {
        self.calls = other.calls;
    }

    /// Whether `call` is currently a reference skimmer.
    pub fn contains(&self, call: &str) -> bool {
        self.calls.contains(call)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(String::as_str)
    }
}

/// Tracks the daily refresh schedule predicate (spec §4.2): refresh once
/// per UTC day, the first time the wall clock's hour equals `refupdhour`
/// and minute exceeds `refupdminute` since the last refresh.
#[derive(Debug)]
pub struct RefreshSchedule {
    refupdhour: u32,
    refupdminute: u32,
    last_refresh_day: Option<i64>,
}

impl RefreshSchedule {
    pub fn new(refupdhour: u32, refupdminute: u32) -> Self {
        Self {
            refupdhour,
            refupdminute,
            last_refresh_day: None,
        }
    }

    /// Given the current UTC `(day, hour, minute)` (`day` any value that
    /// uniquely identifies a calendar day, e.g. epoch seconds / 86400),
    /// decide whether a refresh should fire now. If it fires, the
    /// schedule records `day` as the last refreshed day so it does not
    /// fire again until tomorrow.
    pub fn should_refresh(&mut self, day: i64, hour: u32, minute: u32) -> bool {
        if self.last_refresh_day == Some(day) {
            return false;
        }
        if hour == self.refupdhour && minute > self.refupdminute {
            self.last_refresh_day = Some(day);
            return true;
        }
        false
    }
}

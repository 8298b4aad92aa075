//! Doorbell event history.
//!
//! Keeps the last [`HISTORY_CAPACITY`] events newest-first in a fixed
//! ring and mirrors them to [`HISTORY_FILE`](crate::config::HISTORY_FILE),
//! one `"<timestamp> <description>"` line per entry.  Every update
//! rewrites the whole file from the in-memory ring; the ring stays
//! authoritative when a write fails.

use core::fmt::Write as _;

use heapless::Deque;
use log::{debug, warn};
use serde::Serialize;

use crate::app::events::EventKind;
use crate::app::ports::{StorageError, StoragePort};
use crate::config::HISTORY_FILE;

/// Number of events kept in memory and on flash.
pub const HISTORY_CAPACITY: usize = 32;

/// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
pub type Timestamp = heapless::String<32>;

/// Conversion used by clocks and the file parser.  Text longer than a
/// [`Timestamp`] holds is cut at a char boundary and logged.
pub fn timestamp_from(text: &str) -> Timestamp {
    let mut ts = Timestamp::new();
    for c in text.chars() {
        if ts.push(c).is_err() {
            warn!("History: timestamp '{}' cut to '{}'", text, ts);
            break;
        }
    }
    ts
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

impl HistoryEntry {
    pub fn new(kind: EventKind, timestamp: Timestamp) -> Self {
        Self { timestamp, kind }
    }

    /// Render as a history file line (no trailing newline).
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(self.timestamp.len() + 24);
        let _ = write!(line, "{} {}", self.timestamp, self.kind.description());
        line
    }

    /// Parse a history file line.  The event kind is recognised by its
    /// description suffix; everything before it is the timestamp.
    pub fn parse_line(line: &str) -> Option<Self> {
        EventKind::ALL.into_iter().find_map(|kind| {
            let stamp = line.strip_suffix(kind.description())?.strip_suffix(' ')?;
            Some(Self::new(kind, timestamp_from(stamp)))
        })
    }
}

/// Bounded newest-first journal.
pub struct HistoryLog {
    entries: Deque<HistoryEntry, HISTORY_CAPACITY>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Replace the in-memory ring with the persisted file.
    ///
    /// Lines that do not parse are skipped.  A missing file leaves the
    /// journal empty.
    pub fn load(&mut self, storage: &impl StoragePort) {
        self.entries.clear();
        let lines = match storage.read_lines(HISTORY_FILE) {
            Ok(lines) => lines,
            Err(e) => {
                debug!("History: {} not loaded ({})", HISTORY_FILE, e);
                return;
            }
        };
        for line in lines.iter().filter(|l| !l.is_empty()) {
            match HistoryEntry::parse_line(line) {
                Some(entry) => {
                    if self.entries.push_back(entry).is_err() {
                        break;
                    }
                }
                None => warn!("History: skipping unrecognised line '{}'", line),
            }
        }
        debug!("History: loaded {} entries", self.entries.len());
    }

    /// Prepend an event and rewrite the history file.
    ///
    /// The in-memory journal is updated even when the write fails.
    pub fn record(
        &mut self,
        kind: EventKind,
        timestamp: Timestamp,
        storage: &mut impl StoragePort,
    ) -> Result<(), StorageError> {
        if self.entries.is_full() {
            self.entries.pop_back();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.entries.push_front(HistoryEntry::new(kind, timestamp));

        let lines: Vec<String> = self.entries.iter().map(HistoryEntry::to_line).collect();
        storage.write_lines(HISTORY_FILE, &lines)
    }

    /// Entries newest first.  Each call starts a fresh iteration.
    pub fn recent(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulated measurement data for one well
///
/// `Series` is append-only: rows are added in playback order and are never
/// mutated afterwards, only filtered for display or cleared wholesale.
/// `PlaybackHistory` records which frames playback has visited, so scrubbing
/// backward can reconstruct the chart "as of" any visited frame.

use chrono::NaiveDateTime;

use crate::source::BoundingBox;

/// One chart row: a category count at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub timestamp: NaiveDateTime,
    pub category: String,
    pub value: f64,
}

/// The accumulated per-category rows for one well, in playback order
#[derive(Debug, Clone, Default)]
pub struct Series {
    rows: Vec<SeriesRow>,
}

impl Series {
    pub fn push(&mut self, row: SeriesRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    /// Rows with `timestamp <= bound`, preserving insertion order
    pub fn rows_up_to(&self, bound: NaiveDateTime) -> Vec<SeriesRow> {
        self.rows
            .iter()
            .filter(|row| row.timestamp <= bound)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One visited frame: identifier, record timestamp, and the detections that
/// were rendered with it
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub frame_id: String,
    pub timestamp: NaiveDateTime,
    pub boxes: Vec<BoundingBox>,
    pub labels: Vec<String>,
}

/// Ordered record of the frames visited during playback, one entry per frame
#[derive(Debug, Clone, Default)]
pub struct PlaybackHistory {
    entries: Vec<HistoryEntry>,
}

impl PlaybackHistory {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn contains(&self, frame_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.frame_id == frame_id)
    }

    /// The most recent entry for a frame identifier
    pub fn latest_for(&self, frame_id: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.frame_id == frame_id)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session context: the frame-synchronized time series accumulator
///
/// One instance per user session, passed explicitly through every operation.
/// Holds the playback state plus one `Series`/`PlaybackHistory` pair per
/// well. The accumulator only appends; the pair is replaced only by an
/// explicit clear of that well.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};

use crate::source::{BoundingBox, MeasurementTable};
use crate::state::playback::PlaybackState;
use crate::state::series::{HistoryEntry, PlaybackHistory, Series, SeriesRow};

/// What one `advance` call did, plus the detections to render with the frame
#[derive(Debug, Clone, Default)]
pub struct AdvanceOutcome {
    /// Whether new rows were appended (false for skipped or re-visited frames)
    pub appended: bool,
    pub boxes: Vec<BoundingBox>,
    pub labels: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    pub playback: PlaybackState,
    series: HashMap<String, Series>,
    history: HashMap<String, PlaybackHistory>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the per-well pair exists (first selection of a well)
    pub fn ensure_well(&mut self, well: &str) {
        self.series.entry(well.to_string()).or_default();
        self.history.entry(well.to_string()).or_default();
    }

    pub fn series(&self, well: &str) -> Option<&Series> {
        self.series.get(well)
    }

    pub fn history(&self, well: &str) -> Option<&PlaybackHistory> {
        self.history.get(well)
    }

    /// Accumulate one frame's measurements into the well's series.
    ///
    /// A frame with no matching record is a skipped frame, not an error. A
    /// frame already present in the history is not re-appended, so resuming
    /// playback over its stop frame cannot duplicate rows; its detections
    /// are still returned for rendering.
    pub fn advance(
        &mut self,
        well: &str,
        frame_id: &str,
        table: &MeasurementTable,
    ) -> AdvanceOutcome {
        let record = match table.lookup(frame_id) {
            Ok(record) => record,
            Err(_) => {
                log::debug!("No measurement record for {}, skipping frame", frame_id);
                return AdvanceOutcome::default();
            }
        };

        let history = self.history.entry(well.to_string()).or_default();
        if history.contains(frame_id) {
            return AdvanceOutcome {
                appended: false,
                boxes: record.boxes.clone(),
                labels: record.labels.clone(),
            };
        }

        let series = self.series.entry(well.to_string()).or_default();
        for category in table.categories() {
            if let Some(value) = record.value(category) {
                series.push(SeriesRow {
                    timestamp: record.timestamp,
                    category: category.clone(),
                    value,
                });
            }
        }

        history.push(HistoryEntry {
            frame_id: frame_id.to_string(),
            timestamp: record.timestamp,
            boxes: record.boxes.clone(),
            labels: record.labels.clone(),
        });

        AdvanceOutcome {
            appended: true,
            boxes: record.boxes.clone(),
            labels: record.labels.clone(),
        }
    }

    /// Wipe the series and history of one well and reset playback.
    /// Other wells are untouched.
    pub fn clear_well(&mut self, well: &str) {
        self.series.insert(well.to_string(), Series::default());
        self.history.insert(well.to_string(), PlaybackHistory::default());
        self.playback = self.playback.clear();
    }

    /// Inclusive timestamp bound for displaying the chart at a scrubbed
    /// frame: the latest history entry for that frame, or "now" when the
    /// frame was never visited (which in practice shows the full series).
    pub fn display_bound(&self, well: &str, frame_id: &str) -> NaiveDateTime {
        self.history
            .get(well)
            .and_then(|history| history.latest_for(frame_id))
            .map(|entry| entry.timestamp)
            .unwrap_or_else(|| Utc::now().naive_utc())
    }

    /// Series rows to chart for one well, bounded inclusively by `bound`
    pub fn rows_up_to(&self, well: &str, bound: NaiveDateTime) -> Vec<SeriesRow> {
        self.series
            .get(well)
            .map(|series| series.rows_up_to(bound))
            .unwrap_or_default()
    }

    /// Full accumulated series for one well, in playback order
    pub fn rows(&self, well: &str) -> Vec<SeriesRow> {
        self.series
            .get(well)
            .map(|series| series.rows().to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL: &str = "A1";

    /// Three frames, one category, values 1/2/3 at increasing timestamps
    fn table() -> MeasurementTable {
        MeasurementTable::from_json(
            r#"[
                {"image_name": "f1.png", "image_datetime": "2024-05-29T10:00:00", "A": 1},
                {"image_name": "f2.png", "image_datetime": "2024-05-29T10:05:00", "A": 2},
                {"image_name": "f3.png", "image_datetime": "2024-05-29T10:10:00", "A": 3}
            ]"#,
            None,
        )
        .unwrap()
    }

    const FRAMES: [&str; 3] = ["f1.png", "f2.png", "f3.png"];

    fn ts(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    /// Process the frame playback currently points at
    fn process_current(ctx: &mut SessionContext, table: &MeasurementTable) {
        let index = ctx.playback.index();
        ctx.advance(WELL, FRAMES[index], table);
    }

    /// Drive ticks until playback settles idle, processing each entered frame
    fn run_until_idle(ctx: &mut SessionContext, table: &MeasurementTable) {
        let last = FRAMES.len() - 1;
        while ctx.playback.is_playing() {
            ctx.playback = ctx.playback.advanced(last);
            if ctx.playback.is_playing() {
                process_current(ctx, table);
            }
        }
    }

    #[test]
    fn test_play_to_completion_accumulates_in_order() {
        let table = table();
        let mut ctx = SessionContext::new();
        ctx.ensure_well(WELL);

        ctx.playback = ctx.playback.play();
        process_current(&mut ctx, &table);
        run_until_idle(&mut ctx, &table);

        let rows = ctx.rows(WELL);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0]
        );
        assert!(rows.iter().all(|r| r.category == "A"));
        assert_eq!(ctx.playback, PlaybackState::Idle { index: 2 });

        // History visited each frame exactly once, in playback order
        let visited: Vec<&str> = ctx
            .history(WELL)
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.frame_id.as_str())
            .collect();
        assert_eq!(visited, FRAMES);
    }

    #[test]
    fn test_stop_after_first_frame_then_resume_no_duplicates() {
        let table = table();
        let mut ctx = SessionContext::new();
        ctx.ensure_well(WELL);

        // Play, process frame 0, then stop before the next tick
        ctx.playback = ctx.playback.play();
        process_current(&mut ctx, &table);
        ctx.playback = ctx.playback.stop();

        assert_eq!(ctx.playback, PlaybackState::Idle { index: 0 });
        assert_eq!(ctx.rows(WELL).len(), 1);
        assert_eq!(ctx.rows(WELL)[0].timestamp, ts("2024-05-29T10:00:00"));

        // Resume re-enters frame 0; accumulation must not duplicate its row
        ctx.playback = ctx.playback.resume();
        process_current(&mut ctx, &table);
        run_until_idle(&mut ctx, &table);

        let rows = ctx.rows(WELL);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter()
                .filter(|r| r.timestamp == ts("2024-05-29T10:00:00"))
                .count(),
            1
        );
        assert_eq!(ctx.playback, PlaybackState::Idle { index: 2 });
    }

    #[test]
    fn test_advance_without_record_is_a_noop() {
        let table = table();
        let mut ctx = SessionContext::new();
        ctx.ensure_well(WELL);

        let outcome = ctx.advance(WELL, "unknown.png", &table);

        assert!(!outcome.appended);
        assert!(ctx.rows(WELL).is_empty());
        assert!(ctx.history(WELL).unwrap().is_empty());
    }

    #[test]
    fn test_revisited_frame_is_not_reappended() {
        let table = table();
        let mut ctx = SessionContext::new();

        assert!(ctx.advance(WELL, "f1.png", &table).appended);
        assert!(!ctx.advance(WELL, "f1.png", &table).appended);

        assert_eq!(ctx.rows(WELL).len(), 1);
        assert_eq!(ctx.history(WELL).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_wipes_only_the_active_well() {
        let table = table();
        let mut ctx = SessionContext::new();

        ctx.advance("A1", "f1.png", &table);
        ctx.advance("B2", "f2.png", &table);
        ctx.playback = ctx.playback.play();

        ctx.clear_well("A1");

        assert!(ctx.rows("A1").is_empty());
        assert!(ctx.history("A1").unwrap().is_empty());
        assert_eq!(ctx.rows("B2").len(), 1);
        assert_eq!(ctx.history("B2").unwrap().len(), 1);
        assert_eq!(ctx.playback, PlaybackState::Idle { index: 0 });
    }

    #[test]
    fn test_display_bound_filters_series_at_scrub_target() {
        let table = table();
        let mut ctx = SessionContext::new();

        // Visit f1 and f3 only
        ctx.advance(WELL, "f1.png", &table);
        ctx.advance(WELL, "f3.png", &table);

        let bound = ctx.display_bound(WELL, "f3.png");
        assert_eq!(bound, ts("2024-05-29T10:10:00"));

        let rows = ctx.rows_up_to(WELL, bound);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.timestamp <= bound));

        // Scrubbing to f1 hides the later row
        let bound = ctx.display_bound(WELL, "f1.png");
        let rows = ctx.rows_up_to(WELL, bound);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 1.0);
    }

    #[test]
    fn test_unvisited_frame_bounds_at_now() {
        let table = table();
        let mut ctx = SessionContext::new();

        ctx.advance(WELL, "f1.png", &table);
        ctx.advance(WELL, "f2.png", &table);

        // f3 was never visited: the bound defaults to the current wall clock,
        // which shows the full accumulated series
        let bound = ctx.display_bound(WELL, "f3.png");
        assert_eq!(ctx.rows_up_to(WELL, bound).len(), 2);
    }

    #[test]
    fn test_multiple_categories_one_row_each() {
        let table = MeasurementTable::from_json(
            r#"[{"image_name": "f1.png", "image_datetime": "2024-05-29T10:00:00",
                 "RGB_100": 12, "RGB_101": 3, "RGB_011": 7, "RGB_001": 1}]"#,
            None,
        )
        .unwrap();
        let mut ctx = SessionContext::new();

        ctx.advance(WELL, "f1.png", &table);

        let rows = ctx.rows(WELL);
        assert_eq!(rows.len(), 4);
        // Rows follow the table's category order and share one timestamp
        assert_eq!(
            rows.iter().map(|r| r.category.as_str()).collect::<Vec<_>>(),
            vec!["RGB_001", "RGB_011", "RGB_100", "RGB_101"]
        );
        assert!(rows.iter().all(|r| r.timestamp == rows[0].timestamp));
    }
}

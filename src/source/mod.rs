/// Measurement source adapters
///
/// This module handles:
/// - Parsing measurement records (timestamps, category counts, detections)
/// - Exact-match lookup of records by frame identifier
/// - Loading the record table from a local JSON file (local.rs)
/// - Fetching and caching remote datasource summaries (remote.rs)

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::DashboardError;

pub mod local;
pub mod remote;

/// Category set used by early experiments that predate the datasource
/// reporting its own class names
const LEGACY_CATEGORIES: [&str; 4] = ["RGB_001", "RGB_011", "RGB_100", "RGB_101"];

/// One detection rectangle in image pixel coordinates
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub bbox_left: f32,
    pub bbox_top: f32,
    pub bbox_right: f32,
    pub bbox_bottom: f32,
}

/// A measurement record as stored in the source JSON.
///
/// Two timestamp encodings exist in the wild: separate `date` + `time`
/// strings, or a single `image_datetime`. Category counts arrive as extra
/// top-level numeric fields, so they are captured through `flatten`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub image_name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub image_datetime: Option<String>,
    #[serde(default)]
    pub bbox_results: Vec<BoundingBox>,
    #[serde(default)]
    pub class_name_results: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A parsed measurement record, keyed by frame identifier
#[derive(Debug, Clone)]
pub struct MeasurementRecord {
    pub image_name: String,
    pub timestamp: NaiveDateTime,
    /// Category label -> counted value
    pub values: BTreeMap<String, f64>,
    /// Detection boxes, parallel to `labels` (empty for count-only sources)
    pub boxes: Vec<BoundingBox>,
    pub labels: Vec<String>,
}

impl MeasurementRecord {
    pub fn value(&self, category: &str) -> Option<f64> {
        self.values.get(category).copied()
    }
}

impl RawRecord {
    /// Parse the raw JSON shape into a record. Returns `None` when no
    /// timestamp can be recovered; such rows cannot be placed on the chart.
    pub fn into_record(self) -> Option<MeasurementRecord> {
        let timestamp = parse_timestamp(
            self.date.as_deref(),
            self.time.as_deref(),
            self.image_datetime.as_deref(),
        )?;

        // Every extra numeric field is a category count
        let values: BTreeMap<String, f64> = self
            .extra
            .into_iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
            .collect();

        Some(MeasurementRecord {
            image_name: self.image_name,
            timestamp,
            values,
            boxes: self.bbox_results,
            labels: self.class_name_results,
        })
    }
}

/// Parse a record timestamp from either encoding.
///
/// `date` + `time` example: "2024-05-29" + "11:48:20.963000"
/// `image_datetime` example: "2024-05-29T11:48:20.963000"
fn parse_timestamp(
    date: Option<&str>,
    time: Option<&str>,
    combined: Option<&str>,
) -> Option<NaiveDateTime> {
    if let Some(combined) = combined {
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(combined, format) {
                return Some(parsed);
            }
        }
    }

    if let (Some(date), Some(time)) = (date, time) {
        let joined = format!("{} {}", date, time);
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(parsed);
        }
    }

    None
}

/// The full measurement table for one experiment, plus the ordered category
/// set the chart draws.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    records: Vec<MeasurementRecord>,
    categories: Vec<String>,
}

impl MeasurementTable {
    /// Build a table from parsed records.
    ///
    /// The category order is taken from `configured` when the datasource
    /// reported its class names; otherwise it is derived from the numeric
    /// fields actually present, falling back to the legacy fixed set.
    pub fn new(records: Vec<MeasurementRecord>, configured: Option<Vec<String>>) -> Self {
        let categories = match configured.filter(|c| !c.is_empty()) {
            Some(categories) => categories,
            None => {
                let mut derived: Vec<String> = records
                    .iter()
                    .flat_map(|r| r.values.keys().cloned())
                    .collect();
                derived.sort();
                derived.dedup();

                if derived.is_empty() {
                    LEGACY_CATEGORIES.iter().map(|s| s.to_string()).collect()
                } else {
                    derived
                }
            }
        };

        MeasurementTable { records, categories }
    }

    /// Parse a JSON array of raw records into a table. Rows without a usable
    /// timestamp are dropped with a warning.
    pub fn from_json(data: &str, configured: Option<Vec<String>>) -> Result<Self, DashboardError> {
        let raw: Vec<RawRecord> = serde_json::from_str(data)?;
        let total = raw.len();

        let records: Vec<MeasurementRecord> =
            raw.into_iter().filter_map(RawRecord::into_record).collect();

        if records.len() < total {
            log::warn!(
                "⚠️ Dropped {} measurement rows without a usable timestamp",
                total - records.len()
            );
        }

        Ok(MeasurementTable::new(records, configured))
    }

    /// Exact-match lookup by frame identifier.
    ///
    /// When the source contains duplicate rows for one frame, the first match
    /// is used (lookup order follows source order).
    pub fn lookup(&self, frame_id: &str) -> Result<&MeasurementRecord, DashboardError> {
        self.records
            .iter()
            .find(|record| record.image_name == frame_id)
            .ok_or_else(|| DashboardError::RecordNotFound(frame_id.to_string()))
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A source of measurement tables. Two implementations exist: a local JSON
/// file and the remote datasource with an on-disk cache.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    async fn load(&self) -> Result<MeasurementTable, DashboardError>;

    /// Short human-readable description for the status line
    fn describe(&self) -> String;
}

/// Select the adapter from configuration.
///
/// A configured local file always wins; otherwise the remote adapter is used
/// once a transaction id is known. `None` means no source is available yet.
pub fn build_source(
    config: &AppConfig,
    transaction_id: Option<&str>,
    categories: Option<Vec<String>>,
) -> Option<Box<dyn MeasurementSource>> {
    if let Some(path) = &config.source_data_file {
        return Some(Box::new(local::LocalSource::new(path.clone(), categories)));
    }

    match (&config.datasource_endpoint, transaction_id) {
        (Some(endpoint), Some(transaction_id)) => Some(Box::new(remote::RemoteSource::new(
            endpoint.clone(),
            transaction_id.to_string(),
            config.source_data_folder.clone(),
            config.datasource_timeout,
            categories,
        ))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json() -> &'static str {
        r#"[
            {
                "image_name": "f1.png",
                "date": "2024-05-29",
                "time": "11:48:20.963000",
                "RGB_100": 12,
                "RGB_101": 3,
                "RGB_011": 7,
                "RGB_001": 1
            },
            {
                "image_name": "f2.png",
                "image_datetime": "2024-05-29T11:50:20.963000",
                "RGB_100": 14,
                "RGB_101": 2,
                "RGB_011": 9,
                "RGB_001": 0
            },
            {
                "image_name": "f2.png",
                "image_datetime": "2024-05-29T11:59:59",
                "RGB_100": 99,
                "RGB_101": 99,
                "RGB_011": 99,
                "RGB_001": 99
            }
        ]"#
    }

    #[test]
    fn test_parse_both_timestamp_forms() {
        let table = MeasurementTable::from_json(record_json(), None).unwrap();

        let first = table.lookup("f1.png").unwrap();
        assert_eq!(
            first.timestamp,
            NaiveDateTime::parse_from_str("2024-05-29 11:48:20.963000", "%Y-%m-%d %H:%M:%S%.f")
                .unwrap()
        );

        let second = table.lookup("f2.png").unwrap();
        assert_eq!(second.value("RGB_100"), Some(14.0));
    }

    #[test]
    fn test_duplicate_rows_first_match_wins() {
        let table = MeasurementTable::from_json(record_json(), None).unwrap();

        // Two rows exist for f2.png; lookup must return the first
        let record = table.lookup("f2.png").unwrap();
        assert_eq!(record.value("RGB_001"), Some(0.0));
    }

    #[test]
    fn test_missing_frame_is_record_not_found() {
        let table = MeasurementTable::from_json(record_json(), None).unwrap();

        match table.lookup("missing.png") {
            Err(DashboardError::RecordNotFound(id)) => assert_eq!(id, "missing.png"),
            other => panic!("expected RecordNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_categories_derived_and_sorted() {
        let table = MeasurementTable::from_json(record_json(), None).unwrap();
        assert_eq!(
            table.categories(),
            ["RGB_001", "RGB_011", "RGB_100", "RGB_101"]
        );
    }

    #[test]
    fn test_configured_categories_take_precedence() {
        let table = MeasurementTable::from_json(
            record_json(),
            Some(vec!["K562".to_string(), "NK".to_string()]),
        )
        .unwrap();
        assert_eq!(table.categories(), ["K562", "NK"]);
    }

    #[test]
    fn test_rows_without_timestamp_are_dropped() {
        let data = r#"[{"image_name": "f1.png", "RGB_100": 1}]"#;
        let table = MeasurementTable::from_json(data, None).unwrap();
        assert!(table.is_empty());
        // No usable rows: category set falls back to the legacy fixed list
        assert_eq!(
            table.categories(),
            ["RGB_001", "RGB_011", "RGB_100", "RGB_101"]
        );
    }

    #[test]
    fn test_detection_fields_parsed() {
        let data = r#"[
            {
                "image_name": "f1.png",
                "image_datetime": "2024-05-29T11:48:20",
                "K562": 4,
                "bbox_results": [
                    {"bbox_left": 10.0, "bbox_top": 20.0, "bbox_right": 40.0, "bbox_bottom": 60.0}
                ],
                "class_name_results": ["K562"]
            }
        ]"#;
        let table = MeasurementTable::from_json(data, None).unwrap();

        let record = table.lookup("f1.png").unwrap();
        assert_eq!(record.boxes.len(), 1);
        assert_eq!(record.labels, ["K562"]);
        assert_eq!(record.boxes[0].bbox_right, 40.0);
    }
}

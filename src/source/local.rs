/// Local measurement file adapter
///
/// Reads one JSON array of measurement records from disk. The table is
/// loaded once per process and kept in the session afterwards.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::DashboardError;
use crate::source::{MeasurementSource, MeasurementTable};

pub struct LocalSource {
    path: PathBuf,
    categories: Option<Vec<String>>,
}

impl LocalSource {
    pub fn new(path: PathBuf, categories: Option<Vec<String>>) -> Self {
        LocalSource { path, categories }
    }
}

#[async_trait]
impl MeasurementSource for LocalSource {
    async fn load(&self) -> Result<MeasurementTable, DashboardError> {
        if !self.path.exists() {
            return Err(DashboardError::PathNotFound(self.path.clone()));
        }

        let data = tokio::fs::read_to_string(&self.path).await?;
        let table = MeasurementTable::from_json(&data, self.categories.clone())?;

        log::info!(
            "📄 Loaded {} measurement rows from {}",
            table.len(),
            self.path.display()
        );

        Ok(table)
    }

    fn describe(&self) -> String {
        format!("local file {}", self.path.display())
    }
}

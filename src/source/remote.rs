/// Remote datasource adapter with on-disk caching
///
/// Summaries are fetched once per transaction id from the cell-counting
/// datasource and persisted as `{SOURCE_DATA_FOLDER}/{transaction_id}.json`;
/// every later load is served from that file without re-fetching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::source::{MeasurementSource, MeasurementTable};

/// One entry of the datasource experiment catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperimentEntry {
    pub experiment_name: String,
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct ExperimentsResponse {
    experiments_list: Vec<ExperimentEntry>,
}

/// Per-transaction run metadata reported by the datasource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniqueDetails {
    #[serde(default)]
    pub run_version: Vec<String>,
    #[serde(default)]
    pub run_name: Vec<String>,
    #[serde(default)]
    pub result_class_name: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UniqueDetailsResponse {
    unique_details: UniqueDetails,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    results: serde_json::Value,
}

pub struct RemoteSource {
    endpoint: String,
    transaction_id: String,
    cache_dir: PathBuf,
    categories: Option<Vec<String>>,
    client: Client,
}

impl RemoteSource {
    pub fn new(
        endpoint: String,
        transaction_id: String,
        cache_dir: PathBuf,
        timeout: Duration,
        categories: Option<Vec<String>>,
    ) -> Self {
        RemoteSource {
            endpoint,
            transaction_id,
            cache_dir,
            categories,
            client: build_client(timeout),
        }
    }

    fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.transaction_id))
    }

    fn summary_url(&self) -> String {
        format!("{}/summary/{}", self.endpoint, self.transaction_id)
    }

    /// Fetch the summary and persist its `results` array to the cache path
    async fn fetch_and_cache(&self, cache_path: &Path) -> Result<(), DashboardError> {
        let url = self.summary_url();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DashboardError::DataSourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::DataSourceUnavailable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|e| DashboardError::DataSourceUnavailable(e.to_string()))?;

        // Idempotent: the cache directory may already exist
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(cache_path, serde_json::to_string(&body.results)?).await?;

        log::info!("📦 Cached datasource summary at {}", cache_path.display());

        Ok(())
    }
}

#[async_trait]
impl MeasurementSource for RemoteSource {
    async fn load(&self) -> Result<MeasurementTable, DashboardError> {
        let cache_path = self.cache_path();

        if !cache_path.exists() {
            self.fetch_and_cache(&cache_path).await?;
        } else {
            log::info!("📦 Using cached summary {}", cache_path.display());
        }

        let data = tokio::fs::read_to_string(&cache_path).await?;
        MeasurementTable::from_json(&data, self.categories.clone())
    }

    fn describe(&self) -> String {
        format!("datasource transaction {}", self.transaction_id)
    }
}

/// List the experiments known to the datasource
pub async fn fetch_experiments(
    endpoint: String,
    timeout: Duration,
) -> Result<Vec<ExperimentEntry>, DashboardError> {
    let url = format!("{}/experiments", endpoint);
    let response: ExperimentsResponse = get_json(&url, timeout).await?;
    Ok(response.experiments_list)
}

/// Fetch run metadata (run layout segments and class names) for one transaction
pub async fn fetch_unique_details(
    endpoint: String,
    transaction_id: String,
    timeout: Duration,
) -> Result<UniqueDetails, DashboardError> {
    let url = format!("{}/unique_details/{}", endpoint, transaction_id);
    let response: UniqueDetailsResponse = get_json(&url, timeout).await?;
    Ok(response.unique_details)
}

async fn get_json<T: serde::de::DeserializeOwned>(
    url: &str,
    timeout: Duration,
) -> Result<T, DashboardError> {
    let response = build_client(timeout)
        .get(url)
        .send()
        .await
        .map_err(|e| DashboardError::DataSourceUnavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DashboardError::DataSourceUnavailable(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| DashboardError::DataSourceUnavailable(e.to_string()))
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with_cache(cache_dir: PathBuf) -> RemoteSource {
        RemoteSource::new(
            // Unroutable endpoint: any HTTP attempt in these tests is a bug
            "http://127.0.0.1:9".to_string(),
            "9b33".to_string(),
            cache_dir,
            Duration::from_secs(1),
            None,
        )
    }

    #[test]
    fn test_cache_layout_and_summary_url() {
        let source = source_with_cache(PathBuf::from("/tmp/source-data"));

        assert_eq!(source.cache_path(), PathBuf::from("/tmp/source-data/9b33.json"));
        assert_eq!(source.summary_url(), "http://127.0.0.1:9/summary/9b33");
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_http() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("9b33.json");
        std::fs::write(
            &cache_path,
            r#"[{"image_name": "f1.png", "image_datetime": "2024-05-29T11:48:20", "K562": 2}]"#,
        )
        .unwrap();

        let source = source_with_cache(dir.path().to_path_buf());
        let table = source.load().await.unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("f1.png").unwrap().value("K562"), Some(2.0));
    }

    #[tokio::test]
    async fn test_unreachable_datasource_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_with_cache(dir.path().to_path_buf());

        match source.load().await {
            Err(DashboardError::DataSourceUnavailable(_)) => {}
            other => panic!("expected DataSourceUnavailable, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_catalog_response_shapes() {
        let experiments: ExperimentsResponse = serde_json::from_str(
            r#"{"experiments_list": [{"experiment_name": "Killing Assay", "transaction_id": "9b33"}]}"#,
        )
        .unwrap();
        assert_eq!(experiments.experiments_list[0].transaction_id, "9b33");

        let details: UniqueDetailsResponse = serde_json::from_str(
            r#"{"unique_details": {"run_version": ["v3"], "run_name": ["Run 1"], "result_class_name": ["K562", "NK"]}}"#,
        )
        .unwrap();
        assert_eq!(details.unique_details.result_class_name, ["K562", "NK"]);
    }
}

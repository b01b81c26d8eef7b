/// Environment-sourced configuration
///
/// All values are read once at startup, after `dotenvy` has loaded the local
/// `.env` file. Missing optional values fall back to defaults; a missing
/// image root only disables the browsing view, it never aborts the app.

use std::path::PathBuf;
use std::time::Duration;

/// Default merge subfolder inside each well directory
const DEFAULT_MERGE_FOLDER: &str = "Merged";

/// Default run layout segments used when no remote details are available
const DEFAULT_RUN_VERSION: &str = "v3";
const DEFAULT_RUN_NAME: &str = "Run 1";

/// Default pause between frames during playback, in milliseconds
const DEFAULT_PLAYBACK_INTERVAL_MS: u64 = 500;

/// Default timeout for datasource HTTP requests, in seconds
const DEFAULT_DATASOURCE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root folder holding one subfolder per experiment (`IMAGE_FOLDER_PATH`).
    /// `None` disables browsing until the user picks a folder.
    pub image_root: Option<PathBuf>,
    /// Subfolder of each well that holds the merged frames (`IMAGE_MERGE_FOLDER`)
    pub merge_folder: String,
    /// Run layout segments between experiment and `Images` (`RUN_VERSION`, `RUN_NAME`)
    pub run_version: String,
    pub run_name: String,
    /// Base URL of the cell-counting datasource (`CELL_COUNTING_DATASOURCE_ENDPOINT`)
    pub datasource_endpoint: Option<String>,
    /// Folder for cached datasource summaries (`SOURCE_DATA_FOLDER`)
    pub source_data_folder: PathBuf,
    /// Local measurement table, used instead of the remote source (`SOURCE_DATA_FILE`)
    pub source_data_file: Option<PathBuf>,
    /// Pause between frames during playback (`PLAYBACK_INTERVAL_MS`)
    pub playback_interval: Duration,
    /// Timeout applied to datasource HTTP requests (`DATASOURCE_TIMEOUT_SECS`)
    pub datasource_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let image_root = std::env::var("IMAGE_FOLDER_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let merge_folder = std::env::var("IMAGE_MERGE_FOLDER")
            .unwrap_or_else(|_| DEFAULT_MERGE_FOLDER.to_string());

        let run_version =
            std::env::var("RUN_VERSION").unwrap_or_else(|_| DEFAULT_RUN_VERSION.to_string());
        let run_name = std::env::var("RUN_NAME").unwrap_or_else(|_| DEFAULT_RUN_NAME.to_string());

        let datasource_endpoint = std::env::var("CELL_COUNTING_DATASOURCE_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string());

        let source_data_folder = std::env::var("SOURCE_DATA_FOLDER")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_source_data_folder);

        let source_data_file = std::env::var("SOURCE_DATA_FILE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let playback_interval_ms: u64 = std::env::var("PLAYBACK_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PLAYBACK_INTERVAL_MS);

        let datasource_timeout_secs: u64 = std::env::var("DATASOURCE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DATASOURCE_TIMEOUT_SECS);

        AppConfig {
            image_root,
            merge_folder,
            run_version,
            run_name,
            datasource_endpoint,
            source_data_folder,
            source_data_file,
            playback_interval: Duration::from_millis(playback_interval_ms),
            datasource_timeout: Duration::from_secs(datasource_timeout_secs),
        }
    }

    /// Images directory for one experiment:
    /// `{image_root}/{experiment}/{run_version}/{run_name}/Images`
    pub fn images_dir(&self, experiment: &str) -> Option<PathBuf> {
        let root = self.image_root.as_ref()?;
        Some(
            root.join(experiment)
                .join(&self.run_version)
                .join(&self.run_name)
                .join("Images"),
        )
    }

    /// Frame directory for one well: `{images_dir}/{well}/{merge_folder}`
    pub fn well_dir(&self, experiment: &str, well: &str) -> Option<PathBuf> {
        Some(self.images_dir(experiment)?.join(well).join(&self.merge_folder))
    }
}

/// Fallback cache folder for datasource summaries when `SOURCE_DATA_FOLDER`
/// is unset. Returns ~/.cache/timelapse-viewer/source-data on Linux.
fn default_source_data_folder() -> PathBuf {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push("timelapse-viewer");
    path.push("source-data");
    path
}

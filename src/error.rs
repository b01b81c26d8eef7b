/// Failure taxonomy for the dashboard
///
/// Every failure is handled at the boundary nearest its origin and converted
/// to either a no-op or a user-facing notice. Nothing here should unwind
/// through the playback loop as a crash.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// A required environment value is absent. Fatal for the affected view.
    #[error("configuration value {0} is not set")]
    ConfigurationMissing(&'static str),

    /// The configured image folder does not exist
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The folder exists but contains no png/jpg/jpeg frames
    #[error("no image frames found in {}", .0.display())]
    EmptyFrameSet(PathBuf),

    /// A frame has no matching measurement row (skipped, never fatal)
    #[error("no measurement record for frame {0}")]
    RecordNotFound(String),

    /// The remote datasource returned a non-success status or was unreachable
    #[error("datasource unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

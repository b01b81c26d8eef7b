/// Well frame loader
///
/// A well's frames live flat inside its merge subfolder and play back in
/// lexicographic file-name order. Decoding happens on a blocking task so
/// the UI thread never stalls on a large timelapse.

use std::path::{Path, PathBuf};

use iced::widget::image::Handle;
use tokio::task;
use walkdir::WalkDir;

use crate::error::DashboardError;

/// Frame file extensions accepted by the viewer
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One decoded frame of a well's timelapse
#[derive(Debug, Clone)]
pub struct Frame {
    /// File name, unique within the well; the measurement lookup key
    pub file_name: String,
    /// Position in the sorted sequence
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Decoded RGBA pixels ready for display
    pub handle: Handle,
}

/// List the folders directly under a path, sorted by name.
/// Used for both the experiment list and a run's wells.
pub fn list_folders(path: &Path) -> Result<Vec<String>, DashboardError> {
    if !path.exists() {
        return Err(DashboardError::PathNotFound(path.to_path_buf()));
    }

    let mut folders: Vec<String> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();

    folders.sort();
    Ok(folders)
}

/// Enumerate a well's frame files in playback order
pub fn enumerate_frames(folder: &Path) -> Result<Vec<PathBuf>, DashboardError> {
    if !folder.exists() {
        return Err(DashboardError::PathNotFound(folder.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file() && has_frame_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        return Err(DashboardError::EmptyFrameSet(folder.to_path_buf()));
    }

    // Lexicographic file-name order; all paths share the same parent
    files.sort();
    Ok(files)
}

fn has_frame_extension(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            FRAME_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Load every frame of a well, decoded for display
pub async fn load_frames(folder: PathBuf) -> Result<Vec<Frame>, String> {
    task::spawn_blocking(move || load_frames_blocking(&folder))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

/// Blocking implementation of frame loading
fn load_frames_blocking(folder: &Path) -> Result<Vec<Frame>, String> {
    let paths = enumerate_frames(folder).map_err(|e| e.to_string())?;

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        // A corrupt frame is skipped, not fatal for the whole well
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("⚠️ Failed to decode {}: {}", file_name, e);
                continue;
            }
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        frames.push(Frame {
            file_name,
            index: frames.len(),
            width,
            height,
            handle: Handle::from_rgba(width, height, rgba.into_raw()),
        });
    }

    if frames.is_empty() {
        return Err(format!(
            "No frame in {} could be decoded",
            folder.display()
        ));
    }

    log::info!("📷 Loaded {} frames from {}", frames.len(), folder.display());
    Ok(frames)
}

// Persisted configuration - one JSON object with the ffmpeg path
//
// Loading is best-effort: an absent file, malformed JSON, or a configured
// path that no longer exists on disk all read as "not configured". Only
// saving can fail.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::errors::DownloadError;

pub const CONFIG_FILE_NAME: &str = "downloader_config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloaderConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

/// Default on-disk location: `<config_dir>/vidfetch/downloader_config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidfetch")
        .join(CONFIG_FILE_NAME)
}

/// Load the configured ffmpeg path, if any.
///
/// Returns None when the file is missing, unreadable, malformed, or names
/// an executable that no longer exists on disk.
pub fn load_ffmpeg_path(config_path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(config_path).ok()?;
    let config: DownloaderConfig = serde_json::from_str(&raw).ok()?;
    let ffmpeg = config.ffmpeg_path?;

    if ffmpeg.is_empty() || !Path::new(&ffmpeg).exists() {
        return None;
    }
    Some(ffmpeg)
}

/// Persist the ffmpeg path, creating the parent directory if needed.
pub fn save_ffmpeg_path(config_path: &Path, ffmpeg: &str) -> Result<(), DownloadError> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DownloadError::ConfigInvalid(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    let config = DownloaderConfig {
        ffmpeg_path: Some(ffmpeg.to_string()),
    };
    let body = serde_json::to_string(&config)
        .map_err(|e| DownloadError::ConfigInvalid(e.to_string()))?;

    std::fs::write(config_path, body)
        .map_err(|e| DownloadError::ConfigInvalid(format!("cannot write {}: {}", config_path.display(), e)))
}

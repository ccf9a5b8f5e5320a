// Download engine trait - the seam between the worker session and the
// external downloader tool

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::errors::DownloadError;
use super::models::{DownloadCommand, DownloadProgress, VideoMetadata};

/// External downloader integration driven by the session workers.
///
/// Production code uses the yt-dlp implementation; tests substitute a mock.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Resolved downloader binary, used when constructing commands
    fn binary(&self) -> &str;

    /// Fetch structured metadata for a URL
    async fn fetch_info(&self, url: &str) -> Result<VideoMetadata, DownloadError>;

    /// Run a download command, streaming progress events in line-arrival
    /// order; returns the exit code and the full captured output log.
    async fn run_download(
        &self,
        command: &DownloadCommand,
        progress: UnboundedSender<DownloadProgress>,
    ) -> Result<(i32, String), DownloadError>;
}

pub mod config;
pub mod downloader;
pub mod ytdlp;

pub use config::{default_config_path, load_ffmpeg_path, save_ffmpeg_path, DownloaderConfig};
pub use downloader::{
    build_catalog, build_download_command, ensure_tool_available, DownloadCommand, DownloadEngine,
    DownloadError, DownloadProgress, DownloadRequest, QualityNote, RawFormat, Session,
    StreamCatalog, StreamDescriptor, UiEvent, VideoMetadata,
};
pub use ytdlp::{fetch_video_info, find_ytdlp, run_download, scan_progress_line, YtDlpEngine};

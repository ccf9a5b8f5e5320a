// Error types for the download pipeline

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// Caller-side input problem (empty URL, no stream selected)
    InvalidInput(String),

    /// yt-dlp or ffmpeg executable missing or not invocable
    ToolNotFound(String),

    /// Non-zero exit from an external tool, with captured diagnostic text
    ToolFailed(String),

    /// Persisted config could not be written
    ConfigInvalid(String),

    /// User dismissed a required file/directory picker
    UserCancelled,
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::ToolFailed(msg) => write!(f, "Tool failed: {}", msg),
            Self::ConfigInvalid(msg) => write!(f, "Config error: {}", msg),
            Self::UserCancelled => write!(f, "Cancelled by user"),
        }
    }
}

impl std::error::Error for DownloadError {}

// Classify raw external-tool output into an error kind
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        if s.contains("not found")
            || s.contains("No such file")
            || s.contains("command not found")
        {
            return Self::ToolNotFound(s);
        }

        Self::ToolFailed(s)
    }
}

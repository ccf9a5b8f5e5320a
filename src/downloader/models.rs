// Common data models for the download pipeline

use serde::{Deserialize, Serialize};

/// One raw format record from yt-dlp's `--dump-json` output.
///
/// Every field the tool may omit is optional; absence is treated as "no"
/// by the predicates below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    /// Format ID (e.g., "137", "22")
    #[serde(default)]
    pub format_id: String,
    /// Resolution string (e.g., "1920x1080")
    pub resolution: Option<String>,
    /// Exact file size in bytes
    pub filesize: Option<u64>,
    /// Approximate file size (when exact is unknown)
    pub filesize_approx: Option<u64>,
    /// Container extension (mp4, webm, m4a)
    pub ext: Option<String>,
    /// Video codec (avc1, vp9, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
}

impl RawFormat {
    /// Usable size in bytes: exact if known and positive, else approximate.
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize
            .filter(|s| *s > 0)
            .or(self.filesize_approx.filter(|s| *s > 0))
    }

    pub fn has_video(&self) -> bool {
        self.vcodec
            .as_deref()
            .map_or(false, |v| v != "none" && !v.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.acodec
            .as_deref()
            .map_or(false, |a| a != "none" && !a.is_empty())
    }
}

/// Video metadata from one `--dump-json` object.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoMetadata {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

fn default_title() -> String {
    "N/A".to_string()
}

/// User-facing quality classification of a candidate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityNote {
    /// Progressive stream, audio and video in one file
    Standard,
    /// Video-only stream, merged with a separate audio track after download
    HqMerge,
}

impl QualityNote {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::HqMerge => "HQ - Merged w/ Audio",
        }
    }
}

impl std::fmt::Display for QualityNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One downloadable candidate stream offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    /// "WIDTHxHEIGHT", when the tool reported one
    pub resolution: Option<String>,
    /// Size in binary megabytes, rounded to 2 decimal places, always positive
    pub size_mb: f64,
    pub ext: String,
    /// True when the stream carries both audio and video (no merge needed)
    pub progressive: bool,
    pub note: QualityNote,
}

impl StreamDescriptor {
    /// Vertical resolution parsed from the "WxH" string; 0 when missing or
    /// malformed, so such entries sort last.
    pub fn height(&self) -> u32 {
        self.resolution
            .as_deref()
            .and_then(|r| r.split('x').nth(1))
            .and_then(|h| h.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Concrete external downloader invocation, built fresh per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCommand {
    pub program: String,
    pub args: Vec<String>,
    pub requires_merge: bool,
}

/// Normalized progress signal for one download run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Percent complete, 0.0..=100.0
    pub percent: f32,
    pub status: String,
}

// yt-dlp integration: binary discovery, metadata fetch, progress-line
// parsing and the download run loop.
//
// The matching rules for yt-dlp's semi-structured output live here, behind
// scan_progress_line(), so they can track tool versions without touching
// callers.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::downloader::engine::DownloadEngine;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadCommand, DownloadProgress, VideoMetadata};
use crate::downloader::tools::{hide_console, run_output_with_timeout};

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Find the yt-dlp binary in common install locations, then PATH.
pub fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",          // System installation
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Ok(output) = std::process::Command::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    // Last resort: hope it's in PATH
    "yt-dlp".to_string()
}

/// Fetch video metadata as one `--dump-json` object.
pub async fn fetch_video_info(binary: &str, url: &str) -> Result<VideoMetadata, DownloadError> {
    let args = vec!["--dump-json".to_string(), url.to_string()];
    let output = run_output_with_timeout(binary, &args, FETCH_TIMEOUT_SECS).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // The last stderr line is the actionable diagnostic
        let last = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("yt-dlp failed")
            .trim()
            .to_string();
        eprintln!("[ytdlp] info fetch failed: {}", last);
        return Err(DownloadError::ToolFailed(last));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| DownloadError::ToolFailed(format!("unreadable metadata JSON: {}", e)))
}

lazy_static::lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(r"\[download\]\s+([0-9.]+)%").unwrap();
}

/// Progress events triggered by one output line, in delivery order.
///
/// A merge/extract-audio marker yields a synthetic 100% event; a
/// `[download]  NN.N%` match yields the parsed percent with the raw line
/// as status. A line can trigger both; a malformed numeric match yields
/// nothing.
pub fn scan_progress_line(line: &str) -> Vec<DownloadProgress> {
    let mut events = Vec::with_capacity(2);

    if line.contains("[Merger]") || line.contains("[ExtractAudio]") {
        events.push(DownloadProgress {
            percent: 100.0,
            status: "Merging media files...".to_string(),
        });
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        if let Ok(percent) = caps[1].parse::<f32>() {
            events.push(DownloadProgress {
                percent,
                status: line.to_string(),
            });
        }
    }

    events
}

/// Run a download command, parsing its combined output stream into
/// progress events.
///
/// Every line is appended to the returned log regardless of whether it
/// matched anything. Returns the exit code (-1 on abnormal termination)
/// and the newline-joined log once the child's output is exhausted.
pub async fn run_download(
    command: &DownloadCommand,
    mut on_progress: impl FnMut(DownloadProgress),
) -> Result<(i32, String), DownloadError> {
    let mut cmd = TokioCommand::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console(&mut cmd);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloadError::ToolNotFound(command.program.clone())
        } else {
            DownloadError::ToolFailed(format!("failed to start {}: {}", command.program, e))
        }
    })?;

    // Merge stdout and stderr into one channel so the log sees lines in
    // arrival order, as a single continuous stream.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    // With no readable output stream the loop below ends immediately and
    // an empty log is returned; that is not an error by itself.
    let mut log: Vec<String> = Vec::new();
    while let Some(line) = line_rx.recv().await {
        for event in scan_progress_line(&line) {
            on_progress(event);
        }
        log.push(line);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DownloadError::ToolFailed(format!("failed to wait for {}: {}", command.program, e)))?;

    Ok((status.code().unwrap_or(-1), log.join("\n")))
}

fn spawn_line_reader(
    stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    tx: UnboundedSender<String>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// yt-dlp implementation of the engine seam.
pub struct YtDlpEngine {
    binary: String,
}

impl YtDlpEngine {
    pub fn new() -> Self {
        Self {
            binary: find_ytdlp(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    async fn fetch_info(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        fetch_video_info(&self.binary, url).await
    }

    async fn run_download(
        &self,
        command: &DownloadCommand,
        progress: UnboundedSender<DownloadProgress>,
    ) -> Result<(i32, String), DownloadError> {
        run_download(command, |event| {
            let _ = progress.send(event);
        })
        .await
    }
}

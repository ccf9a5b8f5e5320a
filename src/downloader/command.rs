// Download command construction - pure, no I/O
//
// Turns a selected stream plus target URL and output template into the
// exact yt-dlp argument vector. Deterministic for identical inputs.

use std::path::Path;

use super::models::{DownloadCommand, StreamDescriptor};

/// Build the yt-dlp invocation for one download attempt.
///
/// `ffmpeg_path` is the configured ffmpeg executable path, or empty when
/// unset. For merge-requiring streams with a configured path, yt-dlp is
/// pointed at the directory *containing* the executable.
pub fn build_download_command(
    program: &str,
    stream: &StreamDescriptor,
    url: &str,
    output_template: &str,
    ffmpeg_path: &str,
) -> DownloadCommand {
    let requires_merge = !stream.progressive;

    let selector = if requires_merge {
        // Prefer an AAC/M4A audio track when merging: it muxes into an MP4
        // container more reliably than arbitrary audio codecs.
        format!("{}+bestaudio[ext=m4a]/bestvideo+bestaudio", stream.id)
    } else {
        stream.id.clone()
    };

    let mut args = vec![
        "-f".to_string(),
        selector,
        "--progress".to_string(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "--no-keep-fragments".to_string(),
        "-o".to_string(),
        output_template.to_string(),
    ];

    if requires_merge && !ffmpeg_path.is_empty() {
        if let Some(dir) = parent_dir(ffmpeg_path) {
            args.push("--ffmpeg-location".to_string());
            args.push(dir);
        }
    }

    // URL is always the final positional argument
    args.push(url.to_string());

    DownloadCommand {
        program: program.to_string(),
        args,
        requires_merge,
    }
}

/// Directory containing the given executable path. None for a bare binary
/// name, where there is no directory to point yt-dlp at.
fn parent_dir(path: &str) -> Option<String> {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|p| !p.is_empty())
}

// Worker session - fire-and-forget fetch/download tasks
//
// The UI thread owns the receiving end of one event channel and must never
// block; every long-running operation runs in its own spawned task and
// reports back only through UiEvent values. Workers never touch UI state
// directly. Mutual exclusion between operations (disabled buttons) is the
// caller's responsibility.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::catalog::{build_catalog, StreamCatalog};
use super::command::build_download_command;
use super::engine::DownloadEngine;
use super::errors::DownloadError;
use super::models::{DownloadProgress, StreamDescriptor};
use super::tools::ensure_tool_available;

/// Events marshaled back to the UI thread.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Transient status text
    Status(String),
    /// Fetch finished: title plus the catalog to offer
    Catalog { title: String, catalog: StreamCatalog },
    /// One progress step of a running download
    Progress(DownloadProgress),
    /// Download finished successfully
    Finished(String),
    /// Operation abandoned by the user; controls should re-enable
    Cancelled(String),
    /// Terminal failure; controls should re-enable
    Failed(String),
}

/// Everything one download attempt needs, resolved by the caller from the
/// last fetched catalog.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
    pub stream: StreamDescriptor,
    /// User-chosen output directory; empty means the picker was dismissed
    pub target_dir: String,
    /// Configured ffmpeg executable path; empty means unset
    pub ffmpeg_path: String,
}

/// Spawns the per-operation worker tasks and funnels their events into one
/// channel. Create inside a tokio runtime.
pub struct Session {
    engine: Arc<dyn DownloadEngine>,
    events: UnboundedSender<UiEvent>,
}

impl Session {
    pub fn new(engine: Arc<dyn DownloadEngine>) -> (Self, UnboundedReceiver<UiEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { engine, events }, receiver)
    }

    /// Fetch metadata and build the catalog off-thread. Fire-and-forget;
    /// exactly one terminal event (Catalog or Failed) is emitted.
    pub fn spawn_fetch(&self, url: String, include_non_progressive: bool) {
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();

        tokio::spawn(async move {
            if url.trim().is_empty() {
                let err = DownloadError::InvalidInput("please enter a video URL".to_string());
                let _ = events.send(UiEvent::Failed(err.to_string()));
                return;
            }

            let _ = events.send(UiEvent::Status("Fetching video info...".to_string()));

            match engine.fetch_info(&url).await {
                Ok(info) => {
                    let catalog = build_catalog(&info, include_non_progressive);
                    if catalog.is_empty() {
                        let mut msg =
                            String::from("No downloadable video streams were found.");
                        if !include_non_progressive {
                            msg.push_str(
                                "\n\nTry including the high-quality options for more results.",
                            );
                        }
                        let _ = events.send(UiEvent::Failed(msg));
                        return;
                    }
                    let _ = events.send(UiEvent::Catalog {
                        title: info.title,
                        catalog,
                    });
                }
                Err(e) => {
                    let _ = events.send(UiEvent::Failed(e.to_string()));
                }
            }
        });
    }

    /// Run one download off-thread. Probes ffmpeg first when the selected
    /// stream needs a merge. Fire-and-forget; exactly one terminal event
    /// (Finished, Cancelled or Failed) is emitted, with Progress events in
    /// between.
    pub fn spawn_download(&self, request: DownloadRequest) {
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();

        tokio::spawn(async move {
            if request.target_dir.trim().is_empty() {
                let _ = events.send(UiEvent::Cancelled("Download cancelled.".to_string()));
                return;
            }

            if !request.stream.progressive {
                if ensure_tool_available(&request.ffmpeg_path).await.is_err() {
                    let _ = events.send(UiEvent::Failed(
                        "FFmpeg not found. Set the FFmpeg path or make sure it is installed on your system's PATH."
                            .to_string(),
                    ));
                    return;
                }
            }

            let template = output_template(&request.target_dir, &request.title, &request.stream);
            let command = build_download_command(
                engine.binary(),
                &request.stream,
                &request.url,
                &template,
                &request.ffmpeg_path,
            );
            eprintln!("[session] running {} {}", command.program, command.args.join(" "));

            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let forward = events.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(step) = progress_rx.recv().await {
                    let _ = forward.send(UiEvent::Progress(step));
                }
            });

            let result = engine.run_download(&command, progress_tx).await;
            // drain remaining progress before the terminal event
            let _ = forwarder.await;

            match result {
                Ok((0, _)) => {
                    let _ = events.send(UiEvent::Finished("Download complete!".to_string()));
                }
                Ok((code, log)) => {
                    eprintln!("[session] download exited with code {}", code);
                    let _ = events.send(UiEvent::Failed(failure_message(&log)));
                }
                Err(e) => {
                    let _ = events.send(UiEvent::Failed(e.to_string()));
                }
            }
        });
    }
}

/// Strip the characters that are invalid in file names.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect()
}

/// `<dir>/<sanitized title>-<resolution>.mp4`
pub fn output_template(dir: &str, title: &str, stream: &StreamDescriptor) -> String {
    let name = format!(
        "{}-{}.mp4",
        sanitize_title(title),
        stream.resolution.as_deref().unwrap_or("unknown")
    );
    Path::new(dir).join(name).to_string_lossy().to_string()
}

/// User-facing post-mortem for a failed run: an ffmpeg hint when the log
/// mentions the merge tool, otherwise the last 5 captured lines.
pub fn failure_message(log: &str) -> String {
    let lower = log.to_lowercase();
    if lower.contains("ffmpeg") || lower.contains("ffprobe") {
        return "FFmpeg not found or failed. Set the FFmpeg path to point at your ffmpeg executable."
            .to_string();
    }

    let lines: Vec<&str> = log.trim().lines().collect();
    let tail = lines[lines.len().saturating_sub(5)..].join("\n");
    format!("yt-dlp failed:\n\n...\n{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::engine::DownloadEngine;
    use crate::downloader::errors::DownloadError;
    use crate::downloader::models::{DownloadCommand, QualityNote, RawFormat, VideoMetadata};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockEngine {
        info: Result<VideoMetadata, DownloadError>,
        exit_code: i32,
        log: String,
        progress: Vec<DownloadProgress>,
        recorded: Mutex<Vec<DownloadCommand>>,
    }

    impl MockEngine {
        fn new(info: VideoMetadata) -> Self {
            Self {
                info: Ok(info),
                exit_code: 0,
                log: String::new(),
                progress: Vec::new(),
                recorded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DownloadEngine for MockEngine {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn binary(&self) -> &str {
            "yt-dlp"
        }

        async fn fetch_info(&self, _url: &str) -> Result<VideoMetadata, DownloadError> {
            self.info.clone()
        }

        async fn run_download(
            &self,
            command: &DownloadCommand,
            progress: mpsc::UnboundedSender<DownloadProgress>,
        ) -> Result<(i32, String), DownloadError> {
            self.recorded.lock().unwrap().push(command.clone());
            for step in &self.progress {
                let _ = progress.send(step.clone());
            }
            Ok((self.exit_code, self.log.clone()))
        }
    }

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            title: "My: Video?".to_string(),
            formats: vec![
                RawFormat {
                    format_id: "22".to_string(),
                    resolution: Some("1920x1080".to_string()),
                    filesize: Some(50 << 20),
                    ext: Some("mp4".to_string()),
                    vcodec: Some("avc1".to_string()),
                    acodec: Some("mp4a".to_string()),
                    ..Default::default()
                },
                RawFormat {
                    format_id: "313".to_string(),
                    resolution: Some("3840x2160".to_string()),
                    filesize: Some(80 << 20),
                    ext: Some("webm".to_string()),
                    vcodec: Some("vp9".to_string()),
                    acodec: Some("none".to_string()),
                    ..Default::default()
                },
                RawFormat {
                    format_id: "140".to_string(),
                    filesize: Some(4 << 20),
                    ext: Some("m4a".to_string()),
                    vcodec: Some("none".to_string()),
                    acodec: Some("mp4a".to_string()),
                    ..Default::default()
                },
            ],
        }
    }

    fn progressive_stream() -> StreamDescriptor {
        StreamDescriptor {
            id: "22".to_string(),
            resolution: Some("1920x1080".to_string()),
            size_mb: 50.0,
            ext: "mp4".to_string(),
            progressive: true,
            note: QualityNote::Standard,
        }
    }

    #[tokio::test]
    async fn fetch_with_empty_url_fails_fast() {
        let engine = Arc::new(MockEngine::new(sample_metadata()));
        let (session, mut events) = Session::new(engine);

        session.spawn_fetch("   ".to_string(), false);

        match events.recv().await.unwrap() {
            UiEvent::Failed(msg) => assert!(msg.contains("URL")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn fetch_produces_filtered_catalog() {
        let engine = Arc::new(MockEngine::new(sample_metadata()));
        let (session, mut events) = Session::new(engine);

        session.spawn_fetch("https://example.com/v".to_string(), false);

        assert!(matches!(events.recv().await.unwrap(), UiEvent::Status(_)));
        match events.recv().await.unwrap() {
            UiEvent::Catalog { title, catalog } => {
                assert_eq!(title, "My: Video?");
                // only the 1080p progressive entry survives with HQ off
                assert_eq!(catalog.len(), 1);
                let stream = catalog.get(0).unwrap();
                assert_eq!(stream.id, "22");
                assert_eq!(stream.note, QualityNote::Standard);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_catalog_reports_hint_when_hq_excluded() {
        let metadata = VideoMetadata {
            title: "t".to_string(),
            formats: vec![RawFormat {
                format_id: "313".to_string(),
                resolution: Some("3840x2160".to_string()),
                filesize: Some(80 << 20),
                vcodec: Some("vp9".to_string()),
                acodec: Some("none".to_string()),
                ..Default::default()
            }],
        };
        let engine = Arc::new(MockEngine::new(metadata));
        let (session, mut events) = Session::new(engine);

        session.spawn_fetch("https://example.com/v".to_string(), false);

        assert!(matches!(events.recv().await.unwrap(), UiEvent::Status(_)));
        match events.recv().await.unwrap() {
            UiEvent::Failed(msg) => {
                assert!(msg.contains("No downloadable video streams"));
                assert!(msg.contains("high-quality"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn successful_download_emits_progress_then_finished() {
        let mut engine = MockEngine::new(sample_metadata());
        engine.progress = vec![
            DownloadProgress {
                percent: 45.2,
                status: "[download]  45.2% of 10.00MiB".to_string(),
            },
            DownloadProgress {
                percent: 100.0,
                status: "[download] 100.0% of 10.00MiB".to_string(),
            },
        ];
        let engine = Arc::new(engine);
        let (session, mut events) = Session::new(Arc::clone(&engine) as Arc<dyn DownloadEngine>);

        session.spawn_download(DownloadRequest {
            url: "https://example.com/v".to_string(),
            title: "My: Video?".to_string(),
            stream: progressive_stream(),
            target_dir: "/tmp".to_string(),
            ffmpeg_path: "/opt/homebrew/bin/ffmpeg".to_string(),
        });

        let mut percents = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                UiEvent::Progress(p) => percents.push(p.percent),
                UiEvent::Finished(msg) => {
                    assert_eq!(msg, "Download complete!");
                    break;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(percents, vec![45.2, 100.0]);

        // progressive stream: no ffmpeg override even though a path was set
        let recorded = engine.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].args.iter().any(|a| a == "--ffmpeg-location"));
        // output template carries the sanitized title and resolution
        let template_pos = recorded[0].args.iter().position(|a| a == "-o").unwrap() + 1;
        assert!(recorded[0].args[template_pos].ends_with("My Video-1920x1080.mp4"));
    }

    #[tokio::test]
    async fn failed_download_surfaces_log_tail() {
        let mut engine = MockEngine::new(sample_metadata());
        engine.exit_code = 1;
        engine.log = (1..=8)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let (session, mut events) = Session::new(Arc::new(engine) as Arc<dyn DownloadEngine>);

        session.spawn_download(DownloadRequest {
            url: "https://example.com/v".to_string(),
            title: "t".to_string(),
            stream: progressive_stream(),
            target_dir: "/tmp".to_string(),
            ffmpeg_path: String::new(),
        });

        match events.recv().await.unwrap() {
            UiEvent::Failed(msg) => {
                assert!(msg.contains("line 4"));
                assert!(msg.contains("line 8"));
                assert!(!msg.contains("line 3"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_target_dir_is_cancellation() {
        let (session, mut events) =
            Session::new(Arc::new(MockEngine::new(sample_metadata())) as Arc<dyn DownloadEngine>);

        session.spawn_download(DownloadRequest {
            url: "https://example.com/v".to_string(),
            title: "t".to_string(),
            stream: progressive_stream(),
            target_dir: String::new(),
            ffmpeg_path: String::new(),
        });

        match events.recv().await.unwrap() {
            UiEvent::Cancelled(msg) => assert_eq!(msg, "Download cancelled."),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn merge_download_without_ffmpeg_fails_before_running() {
        let engine = Arc::new(MockEngine::new(sample_metadata()));
        let (session, mut events) = Session::new(Arc::clone(&engine) as Arc<dyn DownloadEngine>);

        session.spawn_download(DownloadRequest {
            url: "https://example.com/v".to_string(),
            title: "t".to_string(),
            stream: StreamDescriptor {
                id: "313".to_string(),
                resolution: Some("3840x2160".to_string()),
                size_mb: 80.0,
                ext: "webm".to_string(),
                progressive: false,
                note: QualityNote::HqMerge,
            },
            target_dir: "/tmp".to_string(),
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
        });

        match events.recv().await.unwrap() {
            UiEvent::Failed(msg) => assert!(msg.contains("FFmpeg not found")),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(engine.recorded.lock().unwrap().is_empty());
    }

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_title(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
    }

    #[test]
    fn failure_message_prefers_ffmpeg_hint() {
        let msg = failure_message("ERROR: ffprobe and ffmpeg not found");
        assert!(msg.contains("FFmpeg"));
        assert!(!msg.contains("ERROR:"));
    }

    #[test]
    fn failure_message_tails_short_logs_whole() {
        let msg = failure_message("only line");
        assert!(msg.contains("only line"));
    }
}

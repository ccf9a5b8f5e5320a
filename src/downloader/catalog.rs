// StreamCatalog - filtered, sorted candidate streams for one fetched URL
//
// Converts the raw format records from yt-dlp into the list offered to the
// user. Handles:
// - Rejecting records without a video track or a usable size
// - Progressive vs merge-requiring classification
// - Binary-megabyte size conversion (2 decimal places)
// - Stable descending sort on parsed vertical resolution
// - 1:1 display labels for the selection widget

use serde::Serialize;

use super::models::{QualityNote, StreamDescriptor, VideoMetadata};

/// Ordered candidate streams plus their display labels.
///
/// The two sequences are always the same length and positionally aligned;
/// both are private so they can only be rebuilt together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamCatalog {
    streams: Vec<StreamDescriptor>,
    options: Vec<String>,
}

impl StreamCatalog {
    fn new(streams: Vec<StreamDescriptor>) -> Self {
        let options = streams.iter().map(display_label).collect();
        Self { streams, options }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Display labels, same order as the streams they describe.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Stream at the selected position, or None when the index is stale.
    pub fn get(&self, index: usize) -> Option<&StreamDescriptor> {
        self.streams.get(index)
    }
}

/// Build the catalog from fetched metadata.
///
/// Records are filtered in order: no video track → reject; no usable size →
/// reject; has audio → include as Standard; video-only → include as HqMerge
/// only when `include_non_progressive` is set. The result is sorted by
/// parsed height descending, ties keeping fetch order.
pub fn build_catalog(info: &VideoMetadata, include_non_progressive: bool) -> StreamCatalog {
    let mut streams = Vec::new();

    for f in &info.formats {
        if !f.has_video() {
            continue;
        }
        let size = match f.effective_size() {
            Some(s) => s,
            None => continue,
        };

        let progressive = f.has_audio();
        if !progressive && !include_non_progressive {
            continue;
        }

        streams.push(StreamDescriptor {
            id: f.format_id.clone(),
            resolution: f.resolution.clone(),
            size_mb: to_megabytes(size),
            ext: f.ext.clone().unwrap_or_else(|| "unknown".to_string()),
            progressive,
            note: if progressive {
                QualityNote::Standard
            } else {
                QualityNote::HqMerge
            },
        });
    }

    // Vec::sort_by is stable, so equal heights keep their fetch order
    streams.sort_by(|a, b| b.height().cmp(&a.height()));

    StreamCatalog::new(streams)
}

/// Bytes to binary megabytes, rounded to 2 decimal places.
fn to_megabytes(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}

fn display_label(stream: &StreamDescriptor) -> String {
    format!(
        "{} ({}) [{}] - {:.2} MB",
        stream.resolution.as_deref().unwrap_or("unknown"),
        stream.note,
        stream.ext,
        stream.size_mb
    )
}

// Download orchestration: catalog building, command construction, tool
// probing and worker sessions

pub mod catalog;
pub mod command;
pub mod engine;
pub mod errors;
pub mod models;
pub mod session;
pub mod tools;

pub use catalog::{build_catalog, StreamCatalog};
pub use command::build_download_command;
pub use engine::DownloadEngine;
pub use errors::DownloadError;
pub use models::{
    DownloadCommand, DownloadProgress, QualityNote, RawFormat, StreamDescriptor, VideoMetadata,
};
pub use session::{DownloadRequest, Session, UiEvent};
pub use tools::ensure_tool_available;

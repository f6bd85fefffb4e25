//! Error types for loading a snapshot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot manifest not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("XZ/LZMA decompression error: {0}")]
    Decompression(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("No memory image given in the manifest or on the command line")]
    NoMemoryImage,

    #[error("Failed to open memory image {path}: {msg}")]
    MemoryImage { path: String, msg: String },

    #[error("Process {0} not found in snapshot")]
    TaskNotFound(u64),

    #[error("Process {pid}: cannot enumerate regions, bad VMA {start:#x}-{end:#x}")]
    BadRegion { pid: u64, start: u64, end: u64 },
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

impl From<criu_img::ImageError> for SnapshotError {
    fn from(e: criu_img::ImageError) -> Self {
        use criu_img::ImageError;
        match e {
            ImageError::FileNotFound(p) => SnapshotError::FileNotFound(p),
            ImageError::Decompression(m) => SnapshotError::Decompression(m),
            ImageError::JsonParse(m) => SnapshotError::JsonParse(m),
            other => SnapshotError::Io(other.to_string()),
        }
    }
}

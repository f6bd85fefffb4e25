//! Errors that abort a dump.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("You have to specify a process to dump. Use the option -p.")]
    MissingPid,

    #[error("snapshot: {0}")]
    Snapshot(#[from] crate::snapshot::error::SnapshotError),

    #[error("image output: {0}")]
    Image(#[from] criu_img::ImageError),
}

pub type DumpResult<T> = Result<T, DumpError>;

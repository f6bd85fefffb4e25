//! Error types for the criu_img crate.

use thiserror::Error;

/// Image encoding/decoding errors.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("XZ/LZMA decompression error: {0}")]
    Decompression(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("JSON serialize error: {0}")]
    Serialize(String),

    #[error("Unexpected magic: expected {expected}, found {found}")]
    BadMagic { expected: String, found: String },
}

pub type ImageResult<T> = Result<T, ImageError>;

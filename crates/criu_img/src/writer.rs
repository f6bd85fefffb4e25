//! Image encoders — pretty JSON records and the raw pages stream.

use crate::error::{ImageError, ImageResult};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;

/// Indentation used by every JSON image.
const JSON_INDENT: &[u8] = b"    ";

/// Serialize a record as 4-space indented JSON into `writer`.
pub fn write_json_image<W: Write, T: Serialize>(writer: &mut W, record: &T) -> ImageResult<()> {
    let formatter = PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut *writer, formatter);
    record
        .serialize(&mut ser)
        .map_err(|e| ImageError::Serialize(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| ImageError::Io(format!("flushing image: {}", e)))
}

/// Serialize a record as 4-space indented JSON into a string.
pub fn to_json_string<T: Serialize>(record: &T) -> ImageResult<String> {
    let mut buf = Vec::new();
    write_json_image(&mut buf, record)?;
    String::from_utf8(buf).map_err(|e| ImageError::Serialize(e.to_string()))
}

/// Writer for `pages-*.img`: page bytes back to back, no header.
///
/// Keeps running totals so callers can check the stream against the pagemap.
pub struct PagesWriter<W: Write> {
    inner: W,
    bytes_written: u64,
    pages_written: u64,
}

impl<W: Write> PagesWriter<W> {
    pub fn new(inner: W) -> Self {
        PagesWriter {
            inner,
            bytes_written: 0,
            pages_written: 0,
        }
    }

    /// Append one page worth of bytes.
    pub fn write_page(&mut self, page: &[u8]) -> ImageResult<()> {
        self.inner
            .write_all(page)
            .map_err(|e| ImageError::Io(format!("writing page {}: {}", self.pages_written, e)))?;
        self.bytes_written += page.len() as u64;
        self.pages_written += 1;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn pages_written(&self) -> u64 {
        self.pages_written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> ImageResult<W> {
        self.inner
            .flush()
            .map_err(|e| ImageError::Io(format!("flushing pages: {}", e)))?;
        Ok(self.inner)
    }
}

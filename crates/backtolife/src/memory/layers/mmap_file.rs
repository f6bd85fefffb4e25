//! Memory-mapped file layer implementation.
//!
//! Maps the raw memory image read-only so page lookups are plain slice
//! copies instead of seek+read pairs.

use crate::memory::error::{LayerError, LayerResult};
use crate::memory::traits::MemoryLayer;
use memmap2::{Mmap, MmapOptions};
use parking_lot::RwLock;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Internal state for the memory-mapped layer.
struct MmapState {
    /// None for a zero-length file, which cannot be mapped.
    mmap: Option<Mmap>,
    size: u64,
}

impl MmapState {
    fn as_slice(&self) -> &[u8] {
        match self.mmap {
            Some(ref mmap) => mmap.as_ref(),
            None => &[],
        }
    }
}

/// A read-only memory-mapped file layer.
///
/// # Thread Safety
///
/// Reads take a shared `parking_lot::RwLock` guard, so one layer can be
/// handed to every task view of a snapshot.
pub struct MmapFileLayer {
    name: String,
    state: Arc<RwLock<MmapState>>,
}

impl MmapFileLayer {
    fn create_mmap(path: &Path) -> LayerResult<MmapState> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        if size == 0 {
            return Ok(MmapState { mmap: None, size: 0 });
        }

        // SAFETY: the image is opened read-only and treated as immutable input.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(MmapState {
            mmap: Some(mmap),
            size,
        })
    }

    /// Open a memory-mapped file layer.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> LayerResult<Self> {
        let state = Self::create_mmap(path.as_ref())?;

        Ok(MmapFileLayer {
            name: name.into(),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Read bytes from the layer.
    ///
    /// With `pad` set, bytes past the end of the file read as zero;
    /// otherwise such a read is an error.
    pub fn read_bytes(&self, offset: u64, length: usize, pad: bool) -> LayerResult<Vec<u8>> {
        let guard = self.state.read();
        let data = guard.as_slice();
        let size = guard.size;

        if offset > size || (offset == size && length > 0) {
            if pad {
                return Ok(vec![0u8; length]);
            }
            return Err(LayerError::invalid_address(
                &self.name,
                offset,
                "Offset outside of the image",
            ));
        }

        let start = offset as usize;
        let available = (size - offset) as usize;

        if length <= available {
            Ok(data[start..start + length].to_vec())
        } else if pad {
            let mut result = Vec::with_capacity(length);
            result.extend_from_slice(&data[start..]);
            result.resize(length, 0);
            Ok(result)
        } else {
            Err(LayerError::invalid_address(
                &self.name,
                offset + available as u64,
                "Could not read sufficient bytes from the image",
            ))
        }
    }

    /// Check if an address range is valid.
    pub fn is_valid(&self, offset: u64, length: u64) -> bool {
        if length == 0 {
            return false;
        }
        let size = self.state.read().size;
        if size == 0 {
            return false;
        }
        let end_offset = offset.saturating_add(length).saturating_sub(1);
        offset < size && end_offset < size
    }
}

impl MemoryLayer for MmapFileLayer {
    fn read(&self, offset: u64, length: usize) -> LayerResult<Vec<u8>> {
        self.read_bytes(offset, length, false)
    }

    fn is_valid(&self, offset: u64, length: u64) -> bool {
        MmapFileLayer::is_valid(self, offset, length)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn maximum_address(&self) -> u64 {
        self.state.read().size.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn layer_with(bytes: &[u8]) -> (NamedTempFile, MmapFileLayer) {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(bytes).unwrap();
        tmpfile.flush().unwrap();
        let layer = MmapFileLayer::open("test", tmpfile.path()).unwrap();
        (tmpfile, layer)
    }

    #[test]
    fn test_open_and_read_bytes() {
        let (_f, layer) = layer_with(b"Hello, World!");
        assert_eq!(layer.read_bytes(0, 5, false).unwrap(), b"Hello");
        assert_eq!(layer.read_bytes(7, 5, false).unwrap(), b"World");
    }

    #[test]
    fn test_read_bytes_with_padding() {
        let (_f, layer) = layer_with(b"Hello");
        assert_eq!(layer.read_bytes(3, 5, true).unwrap(), b"lo\0\0\0");
        assert_eq!(layer.read_bytes(100, 3, true).unwrap(), b"\0\0\0");
    }

    #[test]
    fn test_read_bytes_out_of_bounds_no_pad() {
        let (_f, layer) = layer_with(b"Hello");
        assert!(layer.read_bytes(100, 3, false).is_err());
        assert!(layer.read_bytes(3, 5, false).is_err());
    }

    #[test]
    fn test_is_valid() {
        let (_f, layer) = layer_with(b"0123456789");
        assert!(layer.is_valid(0, 1));
        assert!(layer.is_valid(0, 10));
        assert!(layer.is_valid(9, 1));
        assert!(!layer.is_valid(10, 1));
        assert!(!layer.is_valid(0, 11));
        assert!(!layer.is_valid(0, 0));
    }

    #[test]
    fn test_memory_layer_trait() {
        let (_f, layer) = layer_with(b"Hello, World!");

        let layer_ref: &dyn MemoryLayer = &layer;
        assert_eq!(layer_ref.name(), "test");
        assert_eq!(layer_ref.maximum_address(), 12);
        assert_eq!(layer_ref.read(0, 5).unwrap(), b"Hello");
    }

    #[test]
    fn test_empty_file() {
        let (_f, layer) = layer_with(b"");
        assert!(!layer.is_valid(0, 1));
        assert_eq!(layer.read_bytes(0, 4, true).unwrap(), vec![0u8; 4]);
    }
}

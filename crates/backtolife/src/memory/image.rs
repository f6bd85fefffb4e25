//! Memory image abstraction — wraps MmapFileLayer.

use crate::memory::error::LayerResult;
use crate::memory::layers::MmapFileLayer;
use crate::memory::traits::MemoryLayer;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A memory-mapped raw memory image holding the recovered pages.
pub struct MemoryImage {
    layer: Arc<dyn MemoryLayer>,
}

impl MemoryImage {
    /// Open a raw memory image file.
    pub fn open(path: impl AsRef<Path>) -> LayerResult<Self> {
        let layer = MmapFileLayer::open("physical", path.as_ref())?;
        Ok(MemoryImage {
            layer: Arc::new(layer),
        })
    }

    /// Size of the memory image in bytes.
    pub fn size(&self) -> u64 {
        if self.layer.is_valid(0, 1) {
            self.layer.maximum_address() + 1
        } else {
            0
        }
    }

    /// Read bytes with zero-padding for anything outside the image.
    ///
    /// Never fails: a layer error degrades to an all-zero buffer.
    pub fn read_padded(&self, offset: u64, length: usize) -> Vec<u8> {
        if length == 0 {
            return Vec::new();
        }
        let size = self.size();
        if offset >= size {
            return vec![0u8; length];
        }
        let available = ((size - offset) as usize).min(length);
        match self.layer.read(offset, available) {
            Ok(mut data) => {
                data.resize(length, 0);
                data
            }
            Err(e) => {
                debug!(
                    "{}: zero-filling {} bytes at {:#x}: {}",
                    self.layer.name(),
                    length,
                    offset,
                    e
                );
                vec![0u8; length]
            }
        }
    }
}

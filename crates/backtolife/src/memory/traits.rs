//! Core trait for abstracting memory access.

use crate::memory::error::LayerResult;

/// Trait for reading from a memory layer.
///
/// The snapshot process source reads recovered pages through this, so a
/// test can put any in-memory buffer behind it.
pub trait MemoryLayer: Send + Sync {
    /// Read `length` bytes starting at `offset`.
    fn read(&self, offset: u64, length: usize) -> LayerResult<Vec<u8>>;

    /// Check if the address range `[offset, offset+length)` is valid.
    fn is_valid(&self, offset: u64, length: u64) -> bool;

    /// The name of this layer.
    fn name(&self) -> &str;

    /// Maximum valid address in this layer.
    fn maximum_address(&self) -> u64;
}

//! The view of one recovered process that the dump plugin consumes.
//!
//! Reconstructing these values from physical memory is the analysis
//! subsystem's job; the dump only needs them in this shape.

use serde::{Deserialize, Serialize};

/// One VMA of the target process, in address order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    /// Backing path, a bracketed pseudo-name like `[heap]`, or empty.
    pub name: String,
    /// Access flags as `r`/`w`/`x` characters, `---` when none.
    pub flags: String,
    pub major: u32,
    pub minor: u32,
    pub inode: u64,
    pub pgoff: u64,
}

/// Address boundaries from the process's `mm_struct`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDescriptor {
    pub start_code: u64,
    pub end_code: u64,
    pub start_data: u64,
    pub end_data: u64,
    pub start_stack: u64,
    pub start_brk: u64,
    pub brk: u64,
    pub arg_start: u64,
    pub arg_end: u64,
    pub env_start: u64,
    pub env_end: u64,
}

/// An entry of the process's open-descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub fd: u32,
    /// Opaque handle the source resolves back to a path.
    pub handle: usize,
}

/// Everything the dump reads from the process being checkpointed.
pub trait ProcessAccess {
    fn pid(&self) -> u64;

    /// Command name, for log lines.
    fn comm(&self) -> &str;

    /// The ordered region list.
    fn regions(&self) -> Vec<MemoryRegion>;

    fn memory_descriptor(&self) -> MemoryDescriptor;

    fn open_files(&self) -> Vec<OpenFile>;

    fn resolve_path(&self, file: &OpenFile) -> String;

    /// Read `length` bytes of process memory at `addr`.
    ///
    /// Must not fail: unmapped or unrecoverable bytes come back as zeros.
    fn read_range(&self, addr: u64, length: usize) -> Vec<u8>;

    /// Highest open descriptor number, 0 with no open files.
    fn max_fd(&self) -> u32 {
        self.open_files().iter().map(|f| f.fd).max().unwrap_or(0)
    }
}

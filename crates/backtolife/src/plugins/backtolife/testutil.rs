//! In-memory [`ProcessAccess`] for plugin tests.

use crate::process::{MemoryDescriptor, MemoryRegion, OpenFile, ProcessAccess};

/// A fake process whose memory reads back as `(addr >> 12) as u8` per page,
/// so tests can tell which page landed where in the pages stream.
pub struct MockProcess {
    pub pid: u64,
    pub regions: Vec<MemoryRegion>,
    pub mm: MemoryDescriptor,
    pub files: Vec<(u32, String)>,
}

impl MockProcess {
    pub fn new(pid: u64) -> Self {
        MockProcess {
            pid,
            regions: Vec::new(),
            mm: MemoryDescriptor::default(),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: &[(u32, &str)]) -> Self {
        self.files = files.iter().map(|(fd, p)| (*fd, p.to_string())).collect();
        self
    }

    pub fn region(mut self, start: u64, pages: u64, flags: &str, name: &str, inode: u64) -> Self {
        self.regions.push(region(start, pages, flags, name, inode));
        self
    }
}

pub fn region(start: u64, pages: u64, flags: &str, name: &str, inode: u64) -> MemoryRegion {
    MemoryRegion {
        start,
        end: start + pages * 4096,
        name: name.to_string(),
        flags: flags.to_string(),
        major: if inode != 0 { 8 } else { 0 },
        minor: if inode != 0 { 1 } else { 0 },
        inode,
        pgoff: 0,
    }
}

impl ProcessAccess for MockProcess {
    fn pid(&self) -> u64 {
        self.pid
    }

    fn comm(&self) -> &str {
        "mock"
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.regions.clone()
    }

    fn memory_descriptor(&self) -> MemoryDescriptor {
        self.mm
    }

    fn open_files(&self) -> Vec<OpenFile> {
        self.files
            .iter()
            .enumerate()
            .map(|(handle, (fd, _))| OpenFile { fd: *fd, handle })
            .collect()
    }

    fn resolve_path(&self, file: &OpenFile) -> String {
        self.files[file.handle].1.clone()
    }

    fn read_range(&self, addr: u64, length: usize) -> Vec<u8> {
        (0..length as u64)
            .map(|i| ((addr + i) >> 12) as u8)
            .collect()
    }
}

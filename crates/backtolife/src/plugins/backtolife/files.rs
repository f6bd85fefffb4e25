//! File registry — the `procfiles.json` entries.
//!
//! Filled twice: once from file-backed VMAs during the region walk, then
//! from the open-descriptor table. The second pass appends without checking
//! the first unless de-duplication is asked for.

use crate::process::{MemoryRegion, ProcessAccess};
use criu_img::{FileType, RegFileEntry, RegFilesImage};
use std::collections::HashSet;
use tracing::debug;

/// stdin, stdout, stderr are never registered.
const LAST_STD_FD: u32 = 2;

#[derive(Debug, Default)]
pub struct FileRegistry {
    seen: HashSet<String>,
    entries: Vec<RegFileEntry>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the file behind a VMA, once per path. Returns whether an
    /// entry was added.
    pub fn register_region(&mut self, region: &MemoryRegion, shmid: u64) -> bool {
        if region.inode == 0 || self.seen.contains(&region.name) {
            return false;
        }
        self.seen.insert(region.name.clone());
        self.entries.push(RegFileEntry {
            name: region.name.clone(),
            id: shmid,
            // The program image would be the place for an "extracted"
            // kind; every file is local for now.
            file_type: FileType::Local,
        });
        true
    }

    /// Append every descriptor above stderr as `{path, fd - 1}`.
    ///
    /// With `dedup` off, a path already registered from a VMA is added
    /// again. Returns the number of entries appended.
    pub fn append_open_files(&mut self, process: &dyn ProcessAccess, dedup: bool) -> usize {
        let mut added = 0;
        for file in process.open_files() {
            if file.fd <= LAST_STD_FD {
                continue;
            }
            let path = process.resolve_path(&file);
            if dedup && !self.seen.insert(path.clone()) {
                debug!("fd {} ({}) already registered, skipping", file.fd, path);
                continue;
            }
            self.entries.push(RegFileEntry {
                name: path,
                id: u64::from(file.fd - 1),
                file_type: FileType::Local,
            });
            added += 1;
        }
        added
    }

    pub fn into_image(self) -> RegFilesImage {
        RegFilesImage {
            entries: self.entries,
        }
    }
}

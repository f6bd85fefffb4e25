//! Snapshot-backed [`ProcessAccess`] implementation.

use crate::memory::image::MemoryImage;
use crate::process::{MemoryDescriptor, MemoryRegion, OpenFile, ProcessAccess};
use crate::snapshot::error::{SnapshotError, SnapshotResult};
use crate::snapshot::parser::parse_snapshot_file;
use crate::snapshot::types::{SnapshotManifest, TaskRecord};
use criu_img::PAGE_SIZE;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded manifest plus its opened memory image.
pub struct Snapshot {
    manifest: SnapshotManifest,
    image: Option<Arc<MemoryImage>>,
}

impl Snapshot {
    /// Load a manifest and open the memory image it names.
    ///
    /// `image_override` replaces the manifest's `memory_image`. A relative
    /// manifest path is resolved against the manifest's directory.
    pub fn load(path: impl AsRef<Path>, image_override: Option<&Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let manifest = parse_snapshot_file(path)?;

        let image_path: Option<PathBuf> = match image_override {
            Some(p) => Some(p.to_path_buf()),
            None => manifest.memory_image.as_ref().map(|name| {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                base.join(name)
            }),
        };

        let image = match image_path {
            Some(p) => {
                let image = MemoryImage::open(&p).map_err(|e| SnapshotError::MemoryImage {
                    path: p.display().to_string(),
                    msg: e.to_string(),
                })?;
                info!("Opened memory image {} ({} bytes)", p.display(), image.size());
                Some(Arc::new(image))
            }
            None => None,
        };

        Ok(Snapshot::from_parts(manifest, image))
    }

    /// Build a snapshot from parts already in memory.
    pub fn from_parts(manifest: SnapshotManifest, image: Option<Arc<MemoryImage>>) -> Self {
        Snapshot { manifest, image }
    }

    /// PIDs present in the snapshot, in manifest order.
    pub fn pids(&self) -> Vec<u64> {
        self.manifest.tasks.iter().map(|t| t.pid).collect()
    }

    /// Locate the target process and check its region list is usable.
    pub fn task(&self, pid: u64) -> SnapshotResult<SnapshotTask> {
        let record = self
            .manifest
            .tasks
            .iter()
            .find(|t| t.pid == pid)
            .ok_or(SnapshotError::TaskNotFound(pid))?;

        if let Some(bad) = record.vmas.iter().find(|v| v.start >= v.end) {
            return Err(SnapshotError::BadRegion {
                pid,
                start: bad.start,
                end: bad.end,
            });
        }

        if !record.pages.is_empty() && self.image.is_none() {
            return Err(SnapshotError::NoMemoryImage);
        }

        Ok(SnapshotTask::new(record.clone(), self.image.clone()))
    }
}

/// One process of a snapshot.
pub struct SnapshotTask {
    record: TaskRecord,
    image: Option<Arc<MemoryImage>>,
    /// Page-aligned virtual address → memory image offset.
    page_table: HashMap<u64, u64>,
}

impl SnapshotTask {
    pub fn new(record: TaskRecord, image: Option<Arc<MemoryImage>>) -> Self {
        let page_table: HashMap<u64, u64> = record
            .pages
            .iter()
            .map(|p| (p.vaddr & !(PAGE_SIZE - 1), p.offset))
            .collect();
        debug!(
            "PID {}: {} VMAs, {} recovered pages, {} open files",
            record.pid,
            record.vmas.len(),
            page_table.len(),
            record.files.len()
        );
        SnapshotTask {
            record,
            image,
            page_table,
        }
    }

    fn read_page_part(&self, page_base: u64, in_page: u64, length: usize) -> Vec<u8> {
        match (self.page_table.get(&page_base), &self.image) {
            (Some(&offset), Some(image)) => image.read_padded(offset + in_page, length),
            _ => vec![0u8; length],
        }
    }
}

impl ProcessAccess for SnapshotTask {
    fn pid(&self) -> u64 {
        self.record.pid
    }

    fn comm(&self) -> &str {
        &self.record.comm
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.record.vmas.iter().map(MemoryRegion::from).collect()
    }

    fn memory_descriptor(&self) -> MemoryDescriptor {
        MemoryDescriptor::from(self.record.mm)
    }

    fn open_files(&self) -> Vec<OpenFile> {
        self.record
            .files
            .iter()
            .enumerate()
            .map(|(handle, f)| OpenFile { fd: f.fd, handle })
            .collect()
    }

    fn resolve_path(&self, file: &OpenFile) -> String {
        self.record
            .files
            .get(file.handle)
            .map(|f| f.path.clone())
            .unwrap_or_default()
    }

    fn read_range(&self, addr: u64, length: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(length);
        let mut cur = addr;
        let mut remaining = length;

        while remaining > 0 {
            let page_base = cur & !(PAGE_SIZE - 1);
            let in_page = cur - page_base;
            let chunk = ((PAGE_SIZE - in_page) as usize).min(remaining);
            out.extend_from_slice(&self.read_page_part(page_base, in_page, chunk));
            cur = cur.wrapping_add(chunk as u64);
            remaining -= chunk;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::parser::parse_snapshot_bytes;
    use std::io::Write;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "memory_image": "mem.raw",
        "tasks": [
            {
                "pid": 77,
                "comm": "prog",
                "mm": { "start_brk": "0x602000", "brk": "0x623000" },
                "vmas": [
                    { "start": "0x400000", "end": "0x402000", "flags": "r-x", "name": "/bin/prog", "inode": 9 },
                    { "start": "0x602000", "end": "0x603000", "flags": "rw-", "name": "[heap]" }
                ],
                "files": [ { "fd": 0, "path": "/dev/pts/0" }, { "fd": 4, "path": "/tmp/out.log" } ],
                "pages": [
                    { "vaddr": "0x400000", "offset": "0x1000" },
                    { "vaddr": "0x602000", "offset": 0 }
                ]
            }
        ]
    }"#;

    /// Writes a two-page memory image: page 0 all 0x11, page 1 all 0x22.
    fn snapshot_on_disk() -> (TempDir, Snapshot) {
        let dir = TempDir::new().unwrap();
        let mut raw = std::fs::File::create(dir.path().join("mem.raw")).unwrap();
        raw.write_all(&[0x11u8; 4096]).unwrap();
        raw.write_all(&[0x22u8; 4096]).unwrap();
        raw.flush().unwrap();

        let manifest_path = dir.path().join("snapshot.json");
        std::fs::write(&manifest_path, MANIFEST).unwrap();

        let snapshot = Snapshot::load(&manifest_path, None).unwrap();
        (dir, snapshot)
    }

    #[test]
    fn test_task_lookup() {
        let (_dir, snapshot) = snapshot_on_disk();
        assert_eq!(snapshot.pids(), vec![77]);

        let task = snapshot.task(77).unwrap();
        assert_eq!(task.pid(), 77);
        assert_eq!(task.comm(), "prog");
        assert_eq!(task.regions().len(), 2);
        assert_eq!(task.regions()[1].name, "[heap]");
        assert_eq!(task.memory_descriptor().brk, 0x623000);
        assert_eq!(task.max_fd(), 4);
    }

    #[test]
    fn test_task_not_found() {
        let (_dir, snapshot) = snapshot_on_disk();
        assert!(matches!(snapshot.task(1), Err(SnapshotError::TaskNotFound(1))));
    }

    #[test]
    fn test_resolve_path() {
        let (_dir, snapshot) = snapshot_on_disk();
        let task = snapshot.task(77).unwrap();
        let files = task.open_files();
        assert_eq!(files.len(), 2);
        assert_eq!(task.resolve_path(&files[1]), "/tmp/out.log");
    }

    #[test]
    fn test_read_range_translates_pages() {
        let (_dir, snapshot) = snapshot_on_disk();
        let task = snapshot.task(77).unwrap();

        // 0x400000 is backed by image offset 0x1000 (the 0x22 page).
        assert_eq!(task.read_range(0x400000, 4096), vec![0x22u8; 4096]);
        // 0x602000 is backed by image offset 0 (the 0x11 page).
        assert_eq!(task.read_range(0x602010, 16), vec![0x11u8; 16]);
    }

    #[test]
    fn test_read_range_zero_fills_missing_pages() {
        let (_dir, snapshot) = snapshot_on_disk();
        let task = snapshot.task(77).unwrap();

        // 0x401000 was never recovered.
        assert_eq!(task.read_range(0x401000, 4096), vec![0u8; 4096]);

        // A read straddling a recovered and a missing page.
        let data = task.read_range(0x400ff8, 16);
        assert_eq!(&data[..8], &[0x22u8; 8]);
        assert_eq!(&data[8..], &[0u8; 8]);
    }

    #[test]
    fn test_bad_region_rejected() {
        let manifest = parse_snapshot_bytes(
            br#"{ "tasks": [ { "pid": 5, "vmas": [ { "start": "0x2000", "end": "0x1000", "flags": "r--" } ] } ] }"#,
        )
        .unwrap();
        let snapshot = Snapshot::from_parts(manifest, None);
        assert!(matches!(
            snapshot.task(5),
            Err(SnapshotError::BadRegion { pid: 5, .. })
        ));
    }

    #[test]
    fn test_pages_without_image_rejected() {
        let manifest = parse_snapshot_bytes(
            br#"{ "tasks": [ { "pid": 5, "pages": [ { "vaddr": "0x1000", "offset": 0 } ] } ] }"#,
        )
        .unwrap();
        let snapshot = Snapshot::from_parts(manifest, None);
        assert!(matches!(snapshot.task(5), Err(SnapshotError::NoMemoryImage)));
    }

    #[test]
    fn test_missing_image_file() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("snapshot.json");
        std::fs::write(&manifest_path, MANIFEST).unwrap();
        assert!(matches!(
            Snapshot::load(&manifest_path, None),
            Err(SnapshotError::MemoryImage { .. })
        ));
    }
}

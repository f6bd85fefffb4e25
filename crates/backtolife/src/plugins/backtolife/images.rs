//! Image writer — assembles and serializes the checkpoint records.

use crate::plugins::backtolife::classify::{MapFlags, Protection, StatusFlag, VmaStatus};
use crate::process::{MemoryDescriptor, MemoryRegion};
use criu_img::{
    hex_addr, write_json_image, ImageError, ImageResult, MmEntry, MmImage, PagemapImage,
    RegFilesImage, VmaEntry,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// VMAs are restored anonymously or from the registry, never from an fd.
const VMA_NO_FD: i64 = -1;
const VMA_FDFLAGS: &str = "0x0";

/// A region with everything the mm image needs about it.
#[derive(Debug, Clone)]
pub struct ClassifiedVma {
    pub region: MemoryRegion,
    pub shmid: u64,
    pub prot: Protection,
    pub flags: MapFlags,
    pub status: VmaStatus,
}

impl ClassifiedVma {
    pub fn classify(region: MemoryRegion, shmid: u64) -> Self {
        ClassifiedVma {
            prot: Protection::from_access(&region.flags),
            flags: MapFlags::for_name(&region.name),
            status: VmaStatus::for_name(&region.name),
            region,
            shmid,
        }
    }

    /// Mark this VMA as followed by the vvar area.
    pub fn add_vvar(&mut self) {
        self.status.push(StatusFlag::AreaVvar);
    }

    pub fn to_entry(&self) -> VmaEntry {
        VmaEntry {
            start: hex_addr(self.region.start),
            end: hex_addr(self.region.end),
            pgoff: self.region.pgoff,
            shmid: self.shmid,
            prot: self.prot.to_string(),
            flags: self.flags.to_string(),
            status: self.status.to_string(),
            fd: VMA_NO_FD,
            fdflags: VMA_FDFLAGS.to_string(),
        }
    }
}

pub fn build_mm(mm: &MemoryDescriptor, vmas: &[ClassifiedVma], exe_file_id: u64) -> MmImage {
    MmImage::new(MmEntry {
        mm_start_code: hex_addr(mm.start_code),
        mm_end_code: hex_addr(mm.end_code),
        mm_start_data: hex_addr(mm.start_data),
        mm_end_data: hex_addr(mm.end_data),
        mm_start_stack: hex_addr(mm.start_stack),
        mm_start_brk: hex_addr(mm.start_brk),
        mm_brk: hex_addr(mm.brk),
        mm_arg_start: hex_addr(mm.arg_start),
        mm_arg_end: hex_addr(mm.arg_end),
        mm_env_start: hex_addr(mm.env_start),
        mm_env_end: hex_addr(mm.env_end),
        exe_file_id,
        vmas: vmas.iter().map(ClassifiedVma::to_entry).collect(),
        dumpable: 1,
    })
}

/// The three JSON records of one dump.
#[derive(Debug, Clone)]
pub struct CheckpointImages {
    pub pagemap: PagemapImage,
    pub mm: MmImage,
    pub reg_files: RegFilesImage,
}

pub const PAGES_FILE: &str = "pages-1.img";
pub const REG_FILES_FILE: &str = "procfiles.json";

pub fn pagemap_file(pid: u64) -> String {
    format!("pagemap-{}.json", pid)
}

pub fn mm_file(pid: u64) -> String {
    format!("mm-{}.json", pid)
}

fn create(path: &Path) -> ImageResult<File> {
    File::create(path).map_err(|e| ImageError::Io(format!("creating {}: {}", path.display(), e)))
}

fn remove_created(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("could not remove {}: {}", path.display(), e);
        }
    }
}

/// The four output files, opened together before the region walk.
///
/// Either all four are created or none is left behind.
pub struct ImageFiles {
    pub pages: BufWriter<File>,
    pagemap: File,
    mm: File,
    reg_files: File,
    paths: Vec<PathBuf>,
}

impl ImageFiles {
    pub fn create(dir: &Path, pid: u64) -> ImageResult<Self> {
        let paths = vec![
            dir.join(PAGES_FILE),
            dir.join(pagemap_file(pid)),
            dir.join(mm_file(pid)),
            dir.join(REG_FILES_FILE),
        ];
        let pages = create(&paths[0])?;
        let pagemap = create(&paths[1]).inspect_err(|_| remove_created(&paths[..1]))?;
        let mm = create(&paths[2]).inspect_err(|_| remove_created(&paths[..2]))?;
        let reg_files = create(&paths[3]).inspect_err(|_| remove_created(&paths[..3]))?;
        Ok(ImageFiles {
            pages: BufWriter::new(pages),
            pagemap,
            mm,
            reg_files,
            paths,
        })
    }

    /// Paths in pages, pagemap, mm, procfiles order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Serialize the JSON records, consuming the handles.
    pub fn write_records(self, images: &CheckpointImages) -> ImageResult<()> {
        let ImageFiles {
            mut pages,
            pagemap,
            mm,
            reg_files,
            ..
        } = self;
        pages
            .flush()
            .map_err(|e| ImageError::Io(format!("flushing pages: {}", e)))?;

        write_json_image(&mut BufWriter::new(pagemap), &images.pagemap)?;
        write_json_image(&mut BufWriter::new(mm), &images.mm)?;
        write_json_image(&mut BufWriter::new(reg_files), &images.reg_files)?;
        Ok(())
    }
}

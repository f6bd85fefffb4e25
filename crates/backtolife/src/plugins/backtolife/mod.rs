//! backtolife plugin — checkpoint a recovered process as a CRIU image set.
//!
//! One left-to-right walk over the process's VMAs classifies each region,
//! assigns its `shmid`, registers its backing file and dumps its pages.
//! The open-descriptor table is scanned afterwards, then the pagemap, mm and
//! procfiles records are written next to the pages stream.
//!
//! The vdso is special: it gets a VMA of its own but no pages and no
//! pagemap entry. Instead the last pagemap entry grows by the two vvar
//! pages and the VMA before it is marked `VMA_AREA_VVAR`.

pub mod classify;
pub mod error;
pub mod files;
pub mod images;
pub mod pages;
pub mod shmid;
#[cfg(test)]
pub mod testutil;

pub use error::{DumpError, DumpResult};
pub use images::{CheckpointImages, ImageFiles};

use crate::process::ProcessAccess;
use crate::snapshot::Snapshot;
use classify::VDSO_NAME;
use files::FileRegistry;
use images::{build_mm, ClassifiedVma};
use pages::{is_dumpable, page_count, PageDumper};
use shmid::SharedObjectTable;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Switches for behavior the restore side does not require.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Skip open descriptors whose path a VMA already registered.
    pub dedup_open_files: bool,
}

/// Counters reported after a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub pid: u64,
    pub regions: usize,
    pub dumped_regions: usize,
    pub pages_written: u64,
    pub bytes_written: u64,
    /// Pages in the pagemap that the pages stream has no bytes for.
    pub vvar_pages: u64,
    pub file_entries: usize,
    pub exe_file_id: u64,
}

/// The target PID is the one mandatory input.
pub fn require_pid(pid: Option<u64>) -> DumpResult<u64> {
    pid.ok_or(DumpError::MissingPid)
}

/// Walk the process and build all records, streaming pages into `pages_out`.
pub fn dump_process<W: Write>(
    process: &dyn ProcessAccess,
    options: DumpOptions,
    pages_out: W,
) -> DumpResult<(CheckpointImages, DumpSummary, W)> {
    let regions = process.regions();
    let mut program = String::new();
    let mut shmids = SharedObjectTable::new();
    let mut registry = FileRegistry::new();
    let mut dumper = PageDumper::new(pages_out);
    let mut vmas: Vec<ClassifiedVma> = Vec::with_capacity(regions.len());
    let mut dumped_regions = 0;

    info!("{:<18} {:<18} {:>6} File Path", "Start", "End", "Pages");

    for region in regions {
        if program.is_empty() {
            program = region.name.clone();
        }

        let shmid = shmids.allocate(&program, &region.name, process);
        let vma = ClassifiedVma::classify(region, shmid);
        let region = &vma.region;
        debug!(
            "{:#x}-{:#x} {} {:02x}:{:02x} {} pgoff {:#x} shmid {} {}",
            region.start,
            region.end,
            region.flags,
            region.major,
            region.minor,
            region.inode,
            region.pgoff,
            shmid,
            region.name
        );

        if region.name == VDSO_NAME {
            match vmas.last_mut() {
                Some(prev) => prev.add_vvar(),
                None => warn!("vdso at {:#x} is the first VMA, nothing to mark vvar", region.start),
            }
            if !dumper.merge_vdso() {
                warn!("vdso at {:#x} has no pagemap entry before it", region.start);
            }
        }

        registry.register_region(region, shmid);

        if is_dumpable(region) {
            let npages = dumper.dump_region(process, region)?;
            dumped_regions += 1;
            info!("{:#018x} {:#018x} {:>6} {}", region.start, region.end, npages, region.name);
        } else {
            debug!(
                "not dumping {} ({} pages)",
                region.name,
                page_count(region.start, region.end)
            );
        }

        vmas.push(vma);
    }

    registry.append_open_files(process, options.dedup_open_files);

    let mm = process.memory_descriptor();
    info!("Heap  Start: {:#x} End: {:#x}", mm.start_brk, mm.brk);
    info!("Args  Start: {:#x} End: {:#x}", mm.arg_start, mm.arg_end);
    info!("Env   Start: {:#x} End: {:#x}", mm.env_start, mm.env_end);
    info!("Stack Start: {:#x}", mm.start_stack);

    let exe_file_id = shmids.exe_file_id(&program);
    let dumped = dumper.finish()?;
    let images = CheckpointImages {
        mm: build_mm(&mm, &vmas, exe_file_id),
        pagemap: dumped.pagemap,
        reg_files: registry.into_image(),
    };

    let summary = DumpSummary {
        pid: process.pid(),
        regions: vmas.len(),
        dumped_regions,
        pages_written: dumped.pages_written,
        bytes_written: dumped.bytes_written,
        vvar_pages: dumped.vvar_pages,
        file_entries: images.reg_files.entries.len(),
        exe_file_id,
    };

    Ok((images, summary, dumped.writer))
}

/// Dump `process` into `dump_dir`.
///
/// All four files are created before the walk starts; they are closed on
/// every return path.
/// Dump `pid` out of a loaded snapshot into `dump_dir`.
///
/// A missing pid, an unknown pid and a task whose regions cannot be
/// enumerated all fail before any output file is created.
pub fn run_snapshot(
    snapshot: &Snapshot,
    pid: Option<u64>,
    options: DumpOptions,
    dump_dir: &Path,
) -> DumpResult<DumpSummary> {
    let pid = require_pid(pid)?;
    let task = snapshot
        .task(pid)
        .inspect_err(|_| info!("available PIDs: {:?}", snapshot.pids()))?;
    run(&task, options, dump_dir)
}

pub fn run(process: &dyn ProcessAccess, options: DumpOptions, dump_dir: &Path) -> DumpResult<DumpSummary> {
    info!("Creating pages file of PID: {} ({})", process.pid(), process.comm());

    let mut files = ImageFiles::create(dump_dir, process.pid())?;
    debug!("output files: {:?}", files.paths());
    let (images, summary, _) = dump_process(process, options, &mut files.pages)?;
    files.write_records(&images)?;

    info!(
        "PID {}: {} VMAs, {} dumped, {} pages ({} bytes, {} vvar), {} files, exe_file_id {}",
        summary.pid,
        summary.regions,
        summary.dumped_regions,
        summary.pages_written,
        summary.bytes_written,
        summary.vvar_pages,
        summary.file_entries,
        summary.exe_file_id
    );
    Ok(summary)
}

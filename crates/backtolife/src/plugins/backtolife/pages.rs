//! Page dumper — writes region contents to the pages stream and builds
//! the pagemap alongside.

use crate::plugins::backtolife::classify::{is_cache_file, VDSO_NAME};
use crate::process::{MemoryRegion, ProcessAccess};
use criu_img::{hex_addr, ImageResult, PagemapEntry, PagemapImage, PagesWriter, PAGE_SIZE};
use std::io::Write;
use tracing::debug;

/// Pages the vvar area adds to the entry preceding the vdso. They are
/// counted in the pagemap but never written to the pages stream.
pub const VVAR_PAGES: u64 = 2;

const LOCALE_DIR: &str = "/lib/locale/";

/// Whether the restore side needs this region's contents in the pages stream.
///
/// Skipped: no access at all, the vdso, cache files, executable shared
/// library text (restored from the library itself), and locale archives.
pub fn is_dumpable(region: &MemoryRegion) -> bool {
    let exec_lib = region.name.contains(".so") && region.flags.contains('x');

    region.flags != "---"
        && region.name != VDSO_NAME
        && !is_cache_file(&region.name)
        && !exec_lib
        && !region.name.contains(LOCALE_DIR)
}

/// Number of pages `[start, end)` spans; a trailing partial page counts.
pub fn page_count(start: u64, end: u64) -> u64 {
    end.saturating_sub(start).div_ceil(PAGE_SIZE)
}

/// Result of finishing a [`PageDumper`].
pub struct DumpedPages<W> {
    pub pagemap: PagemapImage,
    pub writer: W,
    pub pages_written: u64,
    pub bytes_written: u64,
    /// Pages added to the pagemap by vdso merges, with no bytes behind them.
    pub vvar_pages: u64,
}

pub struct PageDumper<W: Write> {
    pages: PagesWriter<W>,
    pagemap: PagemapImage,
    vvar_pages: u64,
}

impl<W: Write> PageDumper<W> {
    pub fn new(out: W) -> Self {
        PageDumper {
            pages: PagesWriter::new(out),
            pagemap: PagemapImage::new(),
            vvar_pages: 0,
        }
    }

    /// Copy the region page by page into the stream and add its pagemap
    /// entry. Returns the number of pages written.
    pub fn dump_region(
        &mut self,
        process: &dyn ProcessAccess,
        region: &MemoryRegion,
    ) -> ImageResult<u64> {
        let npages = page_count(region.start, region.end);
        for i in 0..npages {
            let addr = region.start.wrapping_add(i * PAGE_SIZE);
            let page = process.read_range(addr, PAGE_SIZE as usize);
            self.pages.write_page(&page)?;
        }

        self.pagemap.entries.push(PagemapEntry::Pages {
            vaddr: hex_addr(region.start),
            nr_pages: npages,
        });
        Ok(npages)
    }

    /// Account the vvar pages to the most recent pagemap entry.
    ///
    /// Returns false, changing nothing, when no region entry exists yet.
    pub fn merge_vdso(&mut self) -> bool {
        match self.pagemap.entries.last_mut() {
            Some(PagemapEntry::Pages { vaddr, nr_pages }) => {
                *nr_pages += VVAR_PAGES;
                debug!("vdso: {} now covers {} pages", vaddr, nr_pages);
                self.vvar_pages += VVAR_PAGES;
                true
            }
            _ => false,
        }
    }

    pub fn finish(self) -> ImageResult<DumpedPages<W>> {
        let pages_written = self.pages.pages_written();
        let bytes_written = self.pages.bytes_written();
        let writer = self.pages.finish()?;
        Ok(DumpedPages {
            pagemap: self.pagemap,
            writer,
            pages_written,
            bytes_written,
            vvar_pages: self.vvar_pages,
        })
    }
}

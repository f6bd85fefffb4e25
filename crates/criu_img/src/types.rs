//! Record definitions for the JSON-encoded CRIU images.
//!
//! Field order in these structs is the key order of the emitted JSON objects,
//! which is the order the restore side's image decoder expects to see.

use serde::{Deserialize, Serialize};

/// Magic of the pagemap image.
pub const PAGEMAP_MAGIC: &str = "PAGEMAP";

/// Magic of the mm image.
pub const MM_MAGIC: &str = "MM";

/// Page size used for the raw pages stream.
pub const PAGE_SIZE: u64 = 4096;

/// Format an address the way the images carry it: lowercase hex with `0x`.
pub fn hex_addr(value: u64) -> String {
    format!("{:#x}", value)
}

/// `pagemap-<pid>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagemapImage {
    pub magic: String,
    pub entries: Vec<PagemapEntry>,
}

impl PagemapImage {
    /// A pagemap holding only the leading `{pages_id: 1}` header entry.
    pub fn new() -> Self {
        PagemapImage {
            magic: PAGEMAP_MAGIC.to_string(),
            entries: vec![PagemapEntry::Header { pages_id: 1 }],
        }
    }

    /// Entries after the header.
    pub fn page_entries(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().filter_map(|e| match e {
            PagemapEntry::Pages { vaddr, nr_pages } => Some((vaddr.as_str(), *nr_pages)),
            PagemapEntry::Header { .. } => None,
        })
    }

    /// Sum of `nr_pages` over all non-header entries.
    pub fn total_pages(&self) -> u64 {
        self.page_entries().map(|(_, n)| n).sum()
    }
}

impl Default for PagemapImage {
    fn default() -> Self {
        Self::new()
    }
}

/// One pagemap entry. The first entry of an image is always the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PagemapEntry {
    Header { pages_id: u32 },
    Pages { vaddr: String, nr_pages: u64 },
}

/// `mm-<pid>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmImage {
    pub magic: String,
    pub entries: Vec<MmEntry>,
}

impl MmImage {
    pub fn new(entry: MmEntry) -> Self {
        MmImage {
            magic: MM_MAGIC.to_string(),
            entries: vec![entry],
        }
    }
}

/// The single memory-descriptor entry of an mm image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmEntry {
    pub mm_start_code: String,
    pub mm_end_code: String,
    pub mm_start_data: String,
    pub mm_end_data: String,
    pub mm_start_stack: String,
    pub mm_start_brk: String,
    pub mm_brk: String,
    pub mm_arg_start: String,
    pub mm_arg_end: String,
    pub mm_env_start: String,
    pub mm_env_end: String,
    pub exe_file_id: u64,
    pub vmas: Vec<VmaEntry>,
    pub dumpable: u32,
}

/// One VMA of the mm image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmaEntry {
    pub start: String,
    pub end: String,
    pub pgoff: u64,
    pub shmid: u64,
    pub prot: String,
    pub flags: String,
    pub status: String,
    pub fd: i64,
    pub fdflags: String,
}

/// `procfiles.json`: files the restored process needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegFilesImage {
    pub entries: Vec<RegFileEntry>,
}

/// One registered backing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegFileEntry {
    pub name: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

/// How the restore side obtains a registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// The file is expected on the restoring host's filesystem.
    Local,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_addr() {
        assert_eq!(hex_addr(0), "0x0");
        assert_eq!(hex_addr(0x7FFF_DEAD_B000), "0x7fffdeadb000");
    }

    #[test]
    fn test_pagemap_header_serialization() {
        let mut pagemap = PagemapImage::new();
        pagemap.entries.push(PagemapEntry::Pages {
            vaddr: hex_addr(0x400000),
            nr_pages: 3,
        });
        let json = serde_json::to_string(&pagemap).unwrap();
        assert_eq!(
            json,
            r#"{"magic":"PAGEMAP","entries":[{"pages_id":1},{"vaddr":"0x400000","nr_pages":3}]}"#
        );
        assert_eq!(pagemap.total_pages(), 3);
    }

    #[test]
    fn test_pagemap_entry_deserialize_untagged() {
        let header: PagemapEntry = serde_json::from_str(r#"{"pages_id":1}"#).unwrap();
        assert_eq!(header, PagemapEntry::Header { pages_id: 1 });
        let pages: PagemapEntry =
            serde_json::from_str(r#"{"vaddr":"0x1000","nr_pages":2}"#).unwrap();
        assert!(matches!(pages, PagemapEntry::Pages { nr_pages: 2, .. }));
    }

    #[test]
    fn test_reg_file_type_is_lowercase() {
        let entry = RegFileEntry {
            name: "/bin/prog".to_string(),
            id: 5,
            file_type: FileType::Local,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"/bin/prog","id":5,"type":"local"}"#);
    }

    #[test]
    fn test_vma_key_order() {
        let vma = VmaEntry {
            start: "0x1000".to_string(),
            end: "0x2000".to_string(),
            pgoff: 0,
            shmid: 0,
            prot: "PROT_READ".to_string(),
            flags: "MAP_PRIVATE | MAP_ANON".to_string(),
            status: "VMA_AREA_REGULAR | VMA_ANON_PRIVATE".to_string(),
            fd: -1,
            fdflags: "0x0".to_string(),
        };
        let json = serde_json::to_string(&vma).unwrap();
        let keys = ["start", "end", "pgoff", "shmid", "prot", "flags", "status", "fd", "fdflags"];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{}\"", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains(r#""fd":-1"#));
    }
}

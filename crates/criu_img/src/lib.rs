//! CRIU checkpoint image records in their JSON form.
//!
//! A memory dump handed to the restore tool is four artifacts:
//!
//! - `pages-1.img` — raw page bytes, 4096 per page, no header
//! - `pagemap-<pid>.json` — which virtual ranges those pages belong to
//! - `mm-<pid>.json` — memory descriptor boundaries plus the VMA list
//! - `procfiles.json` — backing files the restored process needs
//!
//! This crate owns the record types, their encoding ([`write_json_image`],
//! [`PagesWriter`]) and decoding ([`parse_image_file`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use criu_img::{PagemapImage, PagemapEntry, hex_addr, write_json_image};
//!
//! let mut pagemap = PagemapImage::new();
//! pagemap.entries.push(PagemapEntry::Pages { vaddr: hex_addr(0x400000), nr_pages: 3 });
//! write_json_image(&mut std::io::stdout(), &pagemap)?;
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export key types at crate root.
pub use error::{ImageError, ImageResult};
pub use parser::{parse_image_bytes, parse_image_file, parse_mm_str, parse_pagemap_str, read_maybe_xz};
pub use types::{
    hex_addr, FileType, MmEntry, MmImage, PagemapEntry, PagemapImage, RegFileEntry,
    RegFilesImage, VmaEntry, MM_MAGIC, PAGEMAP_MAGIC, PAGE_SIZE,
};
pub use writer::{to_json_string, write_json_image, PagesWriter};

//! Image parser — reads JSON images back, plain or `.json.xz` compressed.

use crate::error::{ImageError, ImageResult};
use crate::types::{MmImage, PagemapImage, MM_MAGIC, PAGEMAP_MAGIC};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use xz2::read::XzDecoder;

/// Read a file, decompressing it first when the name ends in `.xz`.
pub fn read_maybe_xz(path: impl AsRef<Path>) -> ImageResult<Vec<u8>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ImageError::FileNotFound(path.display().to_string()));
    }

    let file = File::open(path)
        .map_err(|e| ImageError::Io(format!("opening {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    if path.to_string_lossy().to_lowercase().ends_with(".xz") {
        XzDecoder::new(reader)
            .read_to_end(&mut buf)
            .map_err(|e| ImageError::Decompression(format!("{}: {}", path.display(), e)))?;
    } else {
        reader
            .read_to_end(&mut buf)
            .map_err(|e| ImageError::Io(format!("reading {}: {}", path.display(), e)))?;
    }

    Ok(buf)
}

/// Parse any image record from a file.
pub fn parse_image_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> ImageResult<T> {
    let bytes = read_maybe_xz(path)?;
    parse_image_bytes(&bytes)
}

/// Parse any image record from raw JSON bytes.
pub fn parse_image_bytes<T: DeserializeOwned>(json_bytes: &[u8]) -> ImageResult<T> {
    serde_json::from_slice(json_bytes).map_err(|e| ImageError::JsonParse(e.to_string()))
}

/// Parse a pagemap image and check its magic.
pub fn parse_pagemap_str(json: &str) -> ImageResult<PagemapImage> {
    let image: PagemapImage =
        serde_json::from_str(json).map_err(|e| ImageError::JsonParse(e.to_string()))?;
    check_magic(PAGEMAP_MAGIC, &image.magic)?;
    Ok(image)
}

/// Parse an mm image and check its magic.
pub fn parse_mm_str(json: &str) -> ImageResult<MmImage> {
    let image: MmImage =
        serde_json::from_str(json).map_err(|e| ImageError::JsonParse(e.to_string()))?;
    check_magic(MM_MAGIC, &image.magic)?;
    Ok(image)
}

fn check_magic(expected: &str, found: &str) -> ImageResult<()> {
    if expected != found {
        return Err(ImageError::BadMagic {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegFilesImage, FileType};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use xz2::write::XzEncoder;

    const PAGEMAP_JSON: &str = r#"{
        "magic": "PAGEMAP",
        "entries": [
            { "pages_id": 1 },
            { "vaddr": "0x400000", "nr_pages": 3 },
            { "vaddr": "0x7ffff7ff8000", "nr_pages": 5 }
        ]
    }"#;

    #[test]
    fn test_parse_pagemap() {
        let pagemap = parse_pagemap_str(PAGEMAP_JSON).unwrap();
        assert_eq!(pagemap.entries.len(), 3);
        assert_eq!(pagemap.total_pages(), 8);
        let first = pagemap.page_entries().next().unwrap();
        assert_eq!(first, ("0x400000", 3));
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let json = r#"{ "magic": "MM", "entries": [ { "pages_id": 1 } ] }"#;
        match parse_pagemap_str(json) {
            Err(ImageError::BadMagic { expected, found }) => {
                assert_eq!(expected, "PAGEMAP");
                assert_eq!(found, "MM");
            }
            other => panic!("Expected BadMagic, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_reg_files_from_file() {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile
            .write_all(br#"{"entries":[{"name":"/bin/prog","id":3,"type":"local"}]}"#)
            .unwrap();
        tmpfile.flush().unwrap();

        let files: RegFilesImage = parse_image_file(tmpfile.path()).unwrap();
        assert_eq!(files.entries.len(), 1);
        assert_eq!(files.entries[0].id, 3);
        assert_eq!(files.entries[0].file_type, FileType::Local);
    }

    #[test]
    fn test_parse_xz_compressed() {
        let tmpfile = tempfile::Builder::new().suffix(".json.xz").tempfile().unwrap();
        {
            let mut encoder = XzEncoder::new(File::create(tmpfile.path()).unwrap(), 6);
            encoder.write_all(PAGEMAP_JSON.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }

        let pagemap: PagemapImage = parse_image_file(tmpfile.path()).unwrap();
        assert_eq!(pagemap.total_pages(), 8);
    }

    #[test]
    fn test_parse_file_not_found() {
        let result: ImageResult<PagemapImage> = parse_image_file("/nonexistent/pagemap-1.json");
        match result.unwrap_err() {
            ImageError::FileNotFound(path) => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound, got: {:?}", other),
        }
    }
}

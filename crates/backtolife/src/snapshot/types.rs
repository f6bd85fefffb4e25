//! Manifest definitions for a recovered-process snapshot.

use crate::process::{MemoryDescriptor, MemoryRegion};
use serde::{Deserialize, Deserializer};

/// Deserialize a u64 that accepts decimal numbers, hex strings ("0x7ffd1000"),
/// or plain decimal strings ("1234").
fn deserialize_u64_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom("expected unsigned 64-bit integer")),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16).map_err(de::Error::custom)
            } else {
                s.parse::<u64>().map_err(de::Error::custom)
            }
        }
        _ => Err(de::Error::custom("expected number or hex string")),
    }
}

/// Top-level manifest.
#[derive(Debug, Deserialize)]
pub struct SnapshotManifest {
    /// Raw memory image holding the recovered pages, relative to the manifest.
    #[serde(default)]
    pub memory_image: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

/// One recovered process.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    pub pid: u64,
    #[serde(default)]
    pub comm: String,
    #[serde(default)]
    pub mm: MmRecord,
    #[serde(default)]
    pub vmas: Vec<VmaRecord>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    /// Virtual page → memory image offset, for every page that was recovered.
    #[serde(default)]
    pub pages: Vec<PageRecord>,
}

/// `mm_struct` boundaries.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MmRecord {
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub start_code: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub end_code: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub start_data: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub end_data: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub start_stack: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub start_brk: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub brk: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub arg_start: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub arg_end: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub env_start: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub env_end: u64,
}

impl From<MmRecord> for MemoryDescriptor {
    fn from(mm: MmRecord) -> Self {
        MemoryDescriptor {
            start_code: mm.start_code,
            end_code: mm.end_code,
            start_data: mm.start_data,
            end_data: mm.end_data,
            start_stack: mm.start_stack,
            start_brk: mm.start_brk,
            brk: mm.brk,
            arg_start: mm.arg_start,
            arg_end: mm.arg_end,
            env_start: mm.env_start,
            env_end: mm.env_end,
        }
    }
}

/// One VMA as recovered from the process's `vm_area_struct` list.
#[derive(Debug, Clone, Deserialize)]
pub struct VmaRecord {
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub start: u64,
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub end: u64,
    pub flags: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub inode: u64,
    #[serde(default, deserialize_with = "deserialize_u64_hex")]
    pub pgoff: u64,
}

impl From<&VmaRecord> for MemoryRegion {
    fn from(v: &VmaRecord) -> Self {
        MemoryRegion {
            start: v.start,
            end: v.end,
            name: v.name.clone(),
            flags: v.flags.clone(),
            major: v.major,
            minor: v.minor,
            inode: v.inode,
            pgoff: v.pgoff,
        }
    }
}

/// An open descriptor and the path it resolves to.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRecord {
    pub fd: u32,
    #[serde(default)]
    pub path: String,
}

/// Where one recovered virtual page lives in the memory image.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRecord {
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub vaddr: u64,
    #[serde(deserialize_with = "deserialize_u64_hex")]
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_accept_hex_and_decimal() {
        let json = r#"{ "start": "0x400000", "end": 4206592, "flags": "r-x", "pgoff": "4096" }"#;
        let vma: VmaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(vma.start, 0x400000);
        assert_eq!(vma.end, 4206592);
        assert_eq!(vma.pgoff, 4096);
        assert_eq!(vma.name, "");
        assert_eq!(vma.inode, 0);
    }

    #[test]
    fn test_bad_address_rejected() {
        let json = r#"{ "start": "0xzz", "end": 1, "flags": "r--" }"#;
        assert!(serde_json::from_str::<VmaRecord>(json).is_err());
        let json = r#"{ "start": true, "end": 1, "flags": "r--" }"#;
        assert!(serde_json::from_str::<VmaRecord>(json).is_err());
    }

    #[test]
    fn test_mm_record_defaults_missing_fields() {
        let mm: MmRecord = serde_json::from_str(r#"{ "start_brk": "0x602000" }"#).unwrap();
        let desc = MemoryDescriptor::from(mm);
        assert_eq!(desc.start_brk, 0x602000);
        assert_eq!(desc.brk, 0);
    }
}

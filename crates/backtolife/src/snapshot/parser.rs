//! Snapshot manifest parser — plain JSON or `.json.xz`.

use crate::snapshot::error::{SnapshotError, SnapshotResult};
use crate::snapshot::types::SnapshotManifest;
use std::path::Path;

/// Parse a snapshot manifest from a filesystem path.
pub fn parse_snapshot_file(path: impl AsRef<Path>) -> SnapshotResult<SnapshotManifest> {
    let bytes = criu_img::read_maybe_xz(path)?;
    parse_snapshot_bytes(&bytes)
}

/// Parse a snapshot manifest from decompressed JSON bytes.
pub fn parse_snapshot_bytes(json: &[u8]) -> SnapshotResult<SnapshotManifest> {
    serde_json::from_slice(json).map_err(|e| SnapshotError::JsonParse(e.to_string()))
}

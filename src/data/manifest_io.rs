// ============================================================
// Layer 4 — Manifest Files
// ============================================================
// Reads and writes the delimited manifest files:
//
//   image_name,image_path,label_name,label
//   0001.jpg,data/cars/audi_a4/0001.jpg,audi_a4,0
//   ...
//
// The header row is derived from ManifestRecord's field names
// by serde, so writer and reader cannot drift apart.
//
// Reading validates the header: a manifest missing any of the
// expected columns is a SchemaError, not a silent default.

use std::{fs, path::Path};

use crate::domain::error::{VmmrError, VmmrResult};
use crate::domain::manifest::{ManifestRecord, MANIFEST_COLUMNS};

/// Write `records` to `path`, replacing any existing file.
/// Parent directories are created as needed.
pub fn write_manifest(path: impl AsRef<Path>, records: &[ManifestRecord]) -> VmmrResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VmmrError::fs(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| VmmrError::fs(path, e))?;
    for record in records {
        writer.serialize(record).map_err(|e| VmmrError::fs(path, e))?;
    }
    writer.flush().map_err(|e| VmmrError::fs(path, e))?;

    tracing::debug!("Wrote {} manifest rows to '{}'", records.len(), path.display());
    Ok(())
}

/// Read a manifest, keeping at most `row_limit` rows from the top.
pub fn read_manifest(path: impl AsRef<Path>, row_limit: Option<usize>) -> VmmrResult<Vec<ManifestRecord>> {
    let path   = path.as_ref();
    let source = path.display().to_string();

    let mut reader = csv::Reader::from_path(path).map_err(|e| VmmrError::fs(path, e))?;

    let headers = reader.headers().map_err(|e| VmmrError::schema(&source, e.to_string()))?;
    let missing: Vec<&str> = MANIFEST_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();
    if !missing.is_empty() {
        return Err(VmmrError::schema(&source, format!("missing columns: {}", missing.join(", "))));
    }

    let limit = row_limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for row in reader.deserialize::<ManifestRecord>().take(limit) {
        let record = row.map_err(|e| VmmrError::schema(&source, e.to_string()))?;
        records.push(record);
    }

    tracing::debug!("Read {} manifest rows from '{}'", records.len(), source);
    Ok(records)
}

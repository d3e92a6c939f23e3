//! File I/O utilities with atomic writes
//!
//! Each collection persists to its own JSON file; a write is temp file +
//! fsync + rename, so the file is either fully replaced or untouched.
//! Quota exhaustion surfaces as `VaultError::Quota` so callers that want
//! to retry after a cleanup pass can tell it apart from other I/O errors.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{VaultError, VaultResult};

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> VaultResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| VaultError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| VaultError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> VaultResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(VaultError::from)?;
    }

    // Temp file in same directory, required for atomic rename
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(VaultError::from)?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| VaultError::Storage(format!("Failed to serialize data: {}", e)))?;

    writer.flush().map_err(VaultError::from)?;

    // Sync to disk before rename
    writer.get_ref().sync_all().map_err(VaultError::from)?;

    fs::rename(&temp_path, path).map_err(|e| {
        // Try to clean up temp file if rename fails
        let _ = fs::remove_file(&temp_path);
        VaultError::from(e)
    })?;

    Ok(())
}

//! Storage module for persisting harvest state
//!
//! This module handles everything the harvester keeps on disk between runs:
//! - The per-publication JSON state file (processed posts and date watermark)
//! - The artifact inventory, which recovers processed slugs from filenames
//! - Atomic write-then-rename file replacement shared with the output layer

mod inventory;
mod json_store;
mod traits;

pub use inventory::{artifact_exists, ArtifactInventory};
pub use json_store::{JsonStateStore, STATE_FILENAME};
pub use traits::{StateStore, StorageError, StorageResult};

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Ensures a directory exists, creating it and its parents if missing
///
/// # Arguments
///
/// * `dir` - Directory that must exist afterwards
///
/// # Returns
///
/// * `Ok(())` - The directory exists
/// * `Err(StorageError)` - The path exists but is not a directory, or creation failed
pub fn ensure_dir(dir: &Path) -> StorageResult<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(StorageError::OutputDir(format!(
                "{:?} exists and is not a directory",
                dir
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Atomically replaces `path` with `content`
///
/// The content is written to a temporary file in the same directory, synced,
/// and renamed over the target, so readers only ever see the old or the new
/// file in full.
pub fn atomic_write(path: &Path, content: &str) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

//! Timestamped backups of files about to be overwritten.
//! The backup is written with the same temp-then-rename discipline as any
//! other copy, so a crashed backup never leaves a partial file behind.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::copy::safe_copy;

/// Copy `dest` into the backup directory under a timestamped name and return
/// the backup path. A second overwrite within the same second gets a numeric
/// suffix instead of clobbering the first backup.
pub fn create_backup(dest: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("create backup directory '{}'", backup_dir.display()))?;

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");

    let mut backup = backup_dir.join(format!("{stem}_{stamp}{ext}"));
    let mut n = 1u32;
    while backup.exists() {
        backup = backup_dir.join(format!("{stem}_{stamp}_{n}{ext}"));
        n += 1;
    }

    safe_copy(dest, &backup)
        .with_context(|| format!("back up '{}' -> '{}'", dest.display(), backup.display()))?;
    debug!(src = %dest.display(), backup = %backup.display(), "backed up before overwrite");
    Ok(backup)
}

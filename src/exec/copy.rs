//! Safe copy helper:
//! - Streams src into a temp file in the destination directory (O_EXCL,
//!   fsynced before the rename).
//! - Atomically renames temp -> dest, so an interrupted copy never leaves a
//!   partial file at the destination.

use anyhow::{Context, Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::atomic::try_atomic_move;

const BUF_SIZE: usize = 1024 * 1024;

fn unique_temp_path(dst_dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    dst_dir.join(format!(".shelver.{pid}.{nanos}.tmp"))
}

/// Buffered copy into a newly created file, fsynced before returning.
/// `create_new` so a stale temp name is an error rather than a clobber.
fn copy_streaming(src: &Path, dst: &Path) -> io::Result<u64> {
    let src_f = File::open(src)?;
    let dst_f = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let mut reader = BufReader::with_capacity(BUF_SIZE, src_f);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(bytes)
}

/// Core: copy src -> temp in dest dir, then atomic rename temp -> dest.
/// The destination directory must already exist; the rename overwrites an
/// existing destination in one step.
pub fn safe_copy(src: &Path, dest: &Path) -> Result<u64> {
    let dest_dir = dest
        .parent()
        .ok_or_else(|| anyhow!("destination has no parent: {}", dest.display()))?;

    let tmp_path = unique_temp_path(dest_dir);
    let bytes = copy_streaming(src, &tmp_path)
        .with_context(|| format!("copy to temporary file '{}'", tmp_path.display()))?;

    if let Err(e) = try_atomic_move(&tmp_path, dest) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| {
            format!(
                "rename temporary file '{}' -> '{}'",
                tmp_path.display(),
                dest.display()
            )
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copy_lands_content_at_destination() {
        let td = tempdir().unwrap();
        let src = td.path().join("src.txt");
        let dest = td.path().join("out/dst.txt");
        fs::write(&src, b"hello world").unwrap();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();

        let n = safe_copy(&src, &dest).unwrap();
        assert_eq!(n, 11);
        assert_eq!(fs::read(&dest).unwrap(), b"hello world");
        // no temp litter
        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn copy_overwrites_existing_destination_atomically() {
        let td = tempdir().unwrap();
        let src = td.path().join("src.txt");
        let dest = td.path().join("dst.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(&dest, b"old").unwrap();

        safe_copy(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn copy_of_missing_source_fails_without_touching_destination() {
        let td = tempdir().unwrap();
        let src = td.path().join("absent.txt");
        let dest = td.path().join("dst.txt");
        assert!(safe_copy(&src, &dest).is_err());
        assert!(!dest.exists());
    }
}

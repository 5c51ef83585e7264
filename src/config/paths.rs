//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/journal/log paths and detects symlinked
//! ancestors for safety.

use dirs::{config_dir, data_dir, home_dir};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// OS-appropriate default config path, unless SHELVER_CONFIG overrides it.
pub fn default_config_path() -> io::Result<PathBuf> {
    if let Some(p) = std::env::var_os("SHELVER_CONFIG") {
        return Ok(PathBuf::from(p));
    }
    if let Some(mut base) = config_dir() {
        base.push("shelver");
        base.push("config.xml");
        return Ok(base);
    }
    std::env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("shelver")
                .join("config.xml")
        })
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "no config directory available"))
}

/// Default destination base under the user's home directory.
pub fn default_base_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("OrganizedFiles")
}

/// Default backup directory under the config dir.
pub fn default_backup_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelver")
        .join("backups")
}

/// Default transaction journal location (data dir).
pub fn default_journal_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelver")
        .join("journal.jsonl")
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> io::Result<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push("shelver");
        // ensure dir exists (best-effort)
        let _ = fs::create_dir_all(&base);
        base.push("shelver.log");
        return Ok(base);
    }
    std::env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("shelver")
                .join("shelver.log")
        })
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "no data directory available"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

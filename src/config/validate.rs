//! Config validation.
//! Ensures the destination base, backup directory and journal parent exist
//! and are writable before planning starts, so failures surface as one clear
//! configuration error instead of mid-batch I/O noise.

use anyhow::{Context, Result, bail};
use std::fs;
use tracing::{debug, error, info};

use super::types::Config;

/// Validate configured paths for sanity and permissions.
///
/// - base_path will be created if missing and must be writable.
/// - backup_path is created when backups are enabled.
/// - the journal's parent directory is created.
/// - structure template must reference at least one placeholder.
pub fn validate_and_normalize(cfg: &mut Config) -> Result<()> {
    if !cfg.structure.contains('{') {
        bail!(
            "structure template '{}' has no placeholders; every record would collide",
            cfg.structure
        );
    }

    if cfg.base_path.exists() && !cfg.base_path.is_dir() {
        error!("Destination base exists but isn't a directory: {}", cfg.base_path.display());
        bail!(
            "Destination base exists but isn't a directory: {}",
            cfg.base_path.display()
        );
    }
    if !cfg.base_path.exists() {
        fs::create_dir_all(&cfg.base_path).with_context(|| {
            format!("Failed to create destination base '{}'", cfg.base_path.display())
        })?;
        info!("Created destination base directory: {}", cfg.base_path.display());
    }

    // writability probe: create & remove a small temp file
    let probe = cfg
        .base_path
        .join(format!(".shelver_probe_{}.tmp", std::process::id()));
    match fs::OpenOptions::new().create_new(true).write(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            debug!("Destination base writable: {}", cfg.base_path.display());
        }
        Err(e) => {
            bail!(
                "Cannot write to destination base '{}': {}. Check directory permissions.",
                cfg.base_path.display(),
                e
            );
        }
    }

    if cfg.create_backup {
        fs::create_dir_all(&cfg.backup_path).with_context(|| {
            format!("Failed to create backup directory '{}'", cfg.backup_path.display())
        })?;
    }

    if let Some(parent) = cfg.journal_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create journal directory '{}'", parent.display())
        })?;
    }

    // canonicalize so in-batch destination claims compare equal to disk paths
    if let Ok(real) = fs::canonicalize(&cfg.base_path) {
        cfg.base_path = real;
    }

    info!(
        base = %cfg.base_path.display(),
        journal = %cfg.journal_path.display(),
        "Config validated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let td = tempdir().unwrap();
        let mut cfg = Config::with_base(td.path().join("dest"));
        validate_and_normalize(&mut cfg).unwrap();
        assert!(cfg.base_path.is_dir());
        assert!(cfg.backup_path.is_dir());
        assert!(cfg.journal_path.parent().unwrap().is_dir());
    }

    #[test]
    fn rejects_placeholderless_structure() {
        let td = tempdir().unwrap();
        let mut cfg = Config::with_base(td.path());
        cfg.structure = "flat".to_string();
        assert!(validate_and_normalize(&mut cfg).is_err());
    }

    #[test]
    fn rejects_file_as_base() {
        let td = tempdir().unwrap();
        let file = td.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();
        let mut cfg = Config::with_base(&file);
        assert!(validate_and_normalize(&mut cfg).is_err());
    }
}

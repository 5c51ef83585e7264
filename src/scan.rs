//! Local filesystem scanner.
//! Walks the given roots and produces file records for planning. Exclusion
//! patterns apply to individual path components; an excluded directory
//! prunes its whole subtree. Symlinks are not followed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::{FileRecord, SourceKind};

/// `*` is honored only at the pattern's edges; that covers the practical
/// cases (`*.tmp`, `cache*`) without pulling in a glob engine.
fn matches_pattern(name: &str, pattern: &str) -> bool {
    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), Some(_)) => {
            let middle = rest.strip_suffix('*').unwrap_or(rest);
            name.contains(middle)
        }
        (Some(suffix), None) => name.ends_with(suffix),
        (None, Some(prefix)) => name.starts_with(prefix),
        (None, None) => name == pattern,
    }
}

fn is_excluded(name: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|p| matches_pattern(name, p))
}

/// Scan `roots` recursively. A root that is itself a file is recorded
/// directly; unreadable entries are logged and skipped.
pub fn scan_local(roots: &[PathBuf], excludes: &[String]) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    for root in roots {
        if root.is_file() {
            records.push(
                FileRecord::from_path(root, SourceKind::Local)
                    .with_context(|| format!("stat '{}'", root.display()))?,
            );
            continue;
        }
        if !root.is_dir() {
            anyhow::bail!("scan root '{}' does not exist", root.display());
        }
        scan_dir(root, excludes, &mut records)?;
    }
    debug!(roots = roots.len(), records = records.len(), "scan complete");
    Ok(records)
}

fn scan_dir(root: &Path, excludes: &[String], records: &mut Vec<FileRecord>) -> Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Keep the root itself even if its own name matches a pattern.
            e.depth() == 0 || !is_excluded(&e.file_name().to_string_lossy(), excludes)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match FileRecord::from_path(entry.path(), SourceKind::Local) {
            Ok(rec) => records.push(rec),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn excluded_directories_are_pruned() {
        let td = tempdir().unwrap();
        fs::create_dir_all(td.path().join("src")).unwrap();
        fs::create_dir_all(td.path().join(".git/objects")).unwrap();
        fs::write(td.path().join("src/main.rs"), b"x").unwrap();
        fs::write(td.path().join(".git/objects/abc"), b"x").unwrap();
        fs::write(td.path().join("readme.md"), b"x").unwrap();

        let records = scan_local(
            &[td.path().to_path_buf()],
            &[".git".to_string()],
        )
        .unwrap();
        let names: Vec<String> = records.iter().map(|r| r.filename()).collect();
        assert_eq!(names, vec!["readme.md", "main.rs"]);
    }

    #[test]
    fn wildcard_patterns_match_at_edges() {
        assert!(matches_pattern("draft.tmp", "*.tmp"));
        assert!(matches_pattern("cache_v2", "cache*"));
        assert!(matches_pattern("my_backup_old", "*backup*"));
        assert!(!matches_pattern("notes.txt", "*.tmp"));
        assert!(matches_pattern(".git", ".git"));
    }

    #[test]
    fn file_roots_are_recorded_directly() {
        let td = tempdir().unwrap();
        let f = td.path().join("solo.pdf");
        fs::write(&f, b"x").unwrap();
        let records = scan_local(&[f.clone()], &[]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_path, f);
        assert!(records[0].materialized);
    }

    #[test]
    fn missing_root_is_an_error() {
        let td = tempdir().unwrap();
        assert!(scan_local(&[td.path().join("absent")], &[]).is_err());
    }
}

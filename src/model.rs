//! Core data model: file records, plans, transactions and batches.
//! Everything here is plain data; the planning and execution modules own the
//! behavior. Serde derives exist because transactions are persisted verbatim
//! in the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a record was discovered. The engine itself is agnostic; the kind is
/// kept for history display and for the materialization check on Drive
/// records whose paths may be virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    Github,
    Drive,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Local => "local",
            SourceKind::Github => "github",
            SourceKind::Drive => "drive",
        };
        f.write_str(s)
    }
}

/// One discovered file, uniform across scanners. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub source_path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub source: SourceKind,
    /// Repository name hint for GitHub-sourced records.
    pub repo: Option<String>,
    /// Immediate parent directory name, used as a project hint.
    pub parent_folder: Option<String>,
    /// False for records whose path is virtual (e.g. an unfetched Drive
    /// entry). Planning accepts them; execution refuses them.
    pub materialized: bool,
}

impl FileRecord {
    /// Build a record from a local path; fails if the file cannot be stat'd.
    pub fn from_path(path: &Path, source: SourceKind) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified().map(DateTime::<Utc>::from)?;
        Ok(Self {
            source_path: path.to_path_buf(),
            size: meta.len(),
            modified,
            source,
            repo: None,
            parent_folder: path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
            materialized: true,
        })
    }

    /// Full file name (lossy for non-UTF8 names).
    pub fn filename(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without the extension.
    pub fn stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, lowercased; empty if none.
    pub fn extension(&self) -> String {
        self.source_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }
}

/// Filesystem action a plan will perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Copy,
    Move,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanAction::Copy => "copy",
            PlanAction::Move => "move",
        })
    }
}

/// How a destination collision was settled during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    None,
    Skip,
    Renamed,
    Overwritten,
    KeptExisting,
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictDecision::None => "none",
            ConflictDecision::Skip => "skip",
            ConflictDecision::Renamed => "renamed",
            ConflictDecision::Overwritten => "overwritten",
            ConflictDecision::KeptExisting => "kept_existing",
        })
    }
}

/// One planned, not-yet-executed file operation. Consumed (never mutated) by
/// the execution engine; one plan produces at most one filesystem side
/// effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub id: String,
    pub record: FileRecord,
    pub destination: PathBuf,
    pub action: PlanAction,
    pub decision: ConflictDecision,
}

impl fmt::Display for OrganizationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.action {
            PlanAction::Copy => "->",
            PlanAction::Move => "=>",
        };
        write!(
            f,
            "{} {} {}",
            self.record.source_path.display(),
            arrow,
            self.destination.display()
        )?;
        if self.decision != ConflictDecision::None {
            write!(f, " [{}]", self.decision)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOutcome {
    Success,
    Failed,
}

/// The executed (or attempted) result of one plan, persisted in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub plan_id: String,
    pub action: PlanAction,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
    pub outcome: TransactionOutcome,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub dry_run: bool,
    /// Set by the undo projection once the owning batch has been reversed.
    #[serde(default)]
    pub undone: bool,
}

impl Transaction {
    pub fn succeeded(&self) -> bool {
        self.outcome == TransactionOutcome::Success
    }
}

/// Ordered transactions from one organize invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub dry_run: bool,
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub undone: bool,
    /// A batch with failed reversals is terminal: marked partially undone and
    /// never eligible for a second undo attempt.
    #[serde(default)]
    pub partially_undone: bool,
}

impl Batch {
    /// Undo-eligible: real (not dry-run) and never reversed, even partially.
    pub fn reversible(&self) -> bool {
        !self.dry_run && !self.undone && !self.partially_undone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_derives_name_parts() {
        let td = tempdir().unwrap();
        let p = td.path().join("Report Final.PDF");
        std::fs::write(&p, b"x").unwrap();
        let rec = FileRecord::from_path(&p, SourceKind::Local).unwrap();
        assert_eq!(rec.filename(), "Report Final.PDF");
        assert_eq!(rec.stem(), "Report Final");
        assert_eq!(rec.extension(), ".pdf");
        assert!(rec.materialized);
    }

    #[test]
    fn record_without_extension() {
        let td = tempdir().unwrap();
        let p = td.path().join("Makefile");
        std::fs::write(&p, b"x").unwrap();
        let rec = FileRecord::from_path(&p, SourceKind::Local).unwrap();
        assert_eq!(rec.extension(), "");
    }

    #[test]
    fn dry_run_batches_are_not_reversible() {
        let batch = Batch {
            id: "b1".into(),
            timestamp: Utc::now(),
            dry_run: true,
            transactions: vec![],
            undone: false,
            partially_undone: false,
        };
        assert!(!batch.reversible());
    }
}

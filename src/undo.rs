//! Batch reversal.
//! Undoes the most recent reversible batch by walking its transactions in
//! reverse order: moves go back to their sources, copies are deleted, and
//! overwritten files come back from their backups. A reversal that cannot
//! complete records the batch as partially undone; such a batch is terminal
//! and never offered for undo again.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::OrganizerError;
use crate::exec::atomic::is_cross_device;
use crate::exec::copy::safe_copy;
use crate::journal::TransactionJournal;
use crate::model::{PlanAction, Transaction};
use crate::shutdown;

#[derive(Debug)]
pub struct UndoOutcome {
    pub batch_id: String,
    pub reversed: usize,
    pub failed: usize,
    pub partial: bool,
}

pub struct UndoEngine<'a> {
    journal: &'a TransactionJournal,
}

impl<'a> UndoEngine<'a> {
    pub fn new(journal: &'a TransactionJournal) -> Self {
        Self { journal }
    }

    /// Reverse the latest reversible batch. Failed transactions within the
    /// batch changed nothing and are skipped; failed reversals are counted
    /// and leave the batch terminally partial.
    pub fn undo_last_batch(&self) -> Result<UndoOutcome> {
        let batch = self
            .journal
            .last_reversible()?
            .ok_or(OrganizerError::NothingToUndo)?;
        info!(batch = %batch.id, transactions = batch.transactions.len(), "undoing batch");

        let mut reversed = 0usize;
        let mut failed = 0usize;
        let mut interrupted = false;
        for tx in batch.transactions.iter().rev() {
            if shutdown::is_requested() {
                warn!(batch = %batch.id, reversed, "shutdown requested, stopping undo");
                interrupted = true;
                break;
            }
            if !tx.succeeded() {
                continue;
            }
            match reverse_transaction(tx) {
                Ok(()) => {
                    debug!(plan = %tx.plan_id, "reversed");
                    reversed += 1;
                }
                Err(e) => {
                    warn!(plan = %tx.plan_id, error = %format!("{e:#}"), "reversal failed");
                    failed += 1;
                }
            }
        }

        // An interrupted reversal leaves the batch terminally partial, same
        // as a failed one; a second pass over half-restored paths would
        // double-handle them.
        let partial = failed > 0 || interrupted;
        self.journal.mark_undone(&batch.id, partial)?;
        Ok(UndoOutcome {
            batch_id: batch.id,
            reversed,
            failed,
            partial,
        })
    }
}

fn reverse_transaction(tx: &Transaction) -> Result<()> {
    match tx.action {
        PlanAction::Move => {
            if tx.source.exists() {
                return Err(OrganizerError::UndoConflict {
                    occupied: tx.source.clone(),
                    dest: tx.destination.clone(),
                }
                .into());
            }
            move_back(&tx.destination, &tx.source)?;
        }
        PlanAction::Copy => {
            fs::remove_file(&tx.destination).with_context(|| {
                format!("remove copied file '{}'", tx.destination.display())
            })?;
        }
    }

    // An overwritten occupant comes back from its backup.
    if let Some(backup) = &tx.backup {
        safe_copy(backup, &tx.destination).with_context(|| {
            format!(
                "restore backup '{}' -> '{}'",
                backup.display(),
                tx.destination.display()
            )
        })?;
    }

    // Leave no empty directories behind; occupied ones stay.
    if let Some(parent) = tx.destination.parent() {
        let _ = fs::remove_dir(parent);
    }
    Ok(())
}

fn move_back(dest: &Path, source: &Path) -> Result<()> {
    if let Some(parent) = source.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("recreate source directory '{}'", parent.display()))?;
    }
    match fs::rename(dest, source) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            safe_copy(dest, source)?;
            fs::remove_file(dest)
                .with_context(|| format!("remove '{}' after copy back", dest.display()))
        }
        Err(e) => Err(e)
            .with_context(|| format!("move '{}' back to '{}'", dest.display(), source.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::ExecutionEngine;
    use crate::model::{ConflictDecision, FileRecord, OrganizationPlan, SourceKind};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn plan(id: &str, src: &Path, dest: &Path, action: PlanAction) -> OrganizationPlan {
        OrganizationPlan {
            id: id.to_string(),
            record: FileRecord::from_path(src, SourceKind::Local).unwrap(),
            destination: dest.to_path_buf(),
            action,
            decision: ConflictDecision::None,
        }
    }

    fn setup(td: &tempfile::TempDir) -> (Config, TransactionJournal) {
        let cfg = Config::with_base(td.path().join("organized"));
        let journal = TransactionJournal::new(cfg.journal_path.clone());
        (cfg, journal)
    }

    #[test]
    fn undo_restores_moved_files_in_reverse_order() {
        let td = tempdir().unwrap();
        let (cfg, journal) = setup(&td);
        let a = td.path().join("a.txt");
        let b = td.path().join("b.txt");
        fs::write(&a, b"aa").unwrap();
        fs::write(&b, b"bb").unwrap();

        let base = &cfg.base_path;
        let plans = vec![
            plan("p1", &a, &base.join("docs/a.txt"), PlanAction::Move),
            plan("p2", &b, &base.join("docs/b.txt"), PlanAction::Move),
        ];
        let batch = ExecutionEngine::new(&cfg).execute(&plans, false).unwrap();
        journal.append_batch(&batch).unwrap();
        assert!(!a.exists());

        let outcome = UndoEngine::new(&journal).undo_last_batch().unwrap();
        assert_eq!(outcome.reversed, 2);
        assert_eq!(outcome.failed, 0);
        assert!(!outcome.partial);
        assert_eq!(fs::read(&a).unwrap(), b"aa");
        assert_eq!(fs::read(&b).unwrap(), b"bb");
        assert!(!base.join("docs/a.txt").exists());
    }

    #[test]
    fn undo_of_copy_deletes_the_destination_only() {
        let td = tempdir().unwrap();
        let (cfg, journal) = setup(&td);
        let a = td.path().join("a.txt");
        fs::write(&a, b"aa").unwrap();

        let dest = cfg.base_path.join("docs/a.txt");
        let plans = vec![plan("p1", &a, &dest, PlanAction::Copy)];
        let batch = ExecutionEngine::new(&cfg).execute(&plans, false).unwrap();
        journal.append_batch(&batch).unwrap();

        UndoEngine::new(&journal).undo_last_batch().unwrap();
        assert!(a.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn occupied_source_reports_an_undo_conflict() {
        let td = tempdir().unwrap();
        let source = td.path().join("a.txt");
        fs::write(&source, b"intruder").unwrap();

        let tx = Transaction {
            plan_id: "p1".into(),
            action: PlanAction::Move,
            source: source.clone(),
            destination: td.path().join("organized/a.txt"),
            backup: None,
            outcome: crate::model::TransactionOutcome::Success,
            error: None,
            timestamp: chrono::Utc::now(),
            dry_run: false,
            undone: false,
        };
        let err = reverse_transaction(&tx).unwrap_err();
        let oe = err
            .downcast_ref::<OrganizerError>()
            .expect("typed undo error");
        assert_eq!(oe.code(), "undo_conflict");
        assert!(oe.to_string().contains("occupied"), "message: {oe}");
        assert_eq!(fs::read(&source).unwrap(), b"intruder");
    }

    #[test]
    fn empty_journal_has_nothing_to_undo() {
        let td = tempdir().unwrap();
        let (_cfg, journal) = setup(&td);
        let err = UndoEngine::new(&journal).undo_last_batch().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrganizerError>(),
            Some(OrganizerError::NothingToUndo)
        ));
    }

    #[test]
    fn occupied_source_makes_the_undo_partial_and_terminal() {
        let td = tempdir().unwrap();
        let (cfg, journal) = setup(&td);
        let a = td.path().join("a.txt");
        let b = td.path().join("b.txt");
        fs::write(&a, b"aa").unwrap();
        fs::write(&b, b"bb").unwrap();

        let base = cfg.base_path.clone();
        let plans = vec![
            plan("p1", &a, &base.join("docs/a.txt"), PlanAction::Move),
            plan("p2", &b, &base.join("docs/b.txt"), PlanAction::Move),
        ];
        let batch = ExecutionEngine::new(&cfg).execute(&plans, false).unwrap();
        journal.append_batch(&batch).unwrap();

        // Something new took a's old place.
        fs::write(&a, b"intruder").unwrap();

        let outcome = UndoEngine::new(&journal).undo_last_batch().unwrap();
        assert!(outcome.partial);
        assert_eq!(outcome.reversed, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(fs::read(&a).unwrap(), b"intruder");
        assert!(base.join("docs/a.txt").exists());
        assert_eq!(fs::read(&b).unwrap(), b"bb");

        // Terminal: no second attempt.
        let err = UndoEngine::new(&journal).undo_last_batch().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrganizerError>(),
            Some(OrganizerError::NothingToUndo)
        ));
    }

    #[test]
    fn undo_restores_overwritten_files_from_backup() {
        let td = tempdir().unwrap();
        let (mut cfg, _) = setup(&td);
        cfg.create_backup = true;
        let journal = TransactionJournal::new(cfg.journal_path.clone());

        let dest = cfg.base_path.join("docs/a.txt");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"old").unwrap();
        let src = td.path().join("a.txt");
        fs::write(&src, b"new").unwrap();

        let plans = vec![plan("p1", &src, &dest, PlanAction::Move)];
        let batch = ExecutionEngine::new(&cfg).execute(&plans, false).unwrap();
        journal.append_batch(&batch).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");

        UndoEngine::new(&journal).undo_last_batch().unwrap();
        assert_eq!(fs::read(&src).unwrap(), b"new");
        assert_eq!(fs::read(&dest).unwrap(), b"old");
    }

    #[test]
    #[serial_test::serial]
    fn shutdown_request_stops_the_reversal_loop() {
        let td = tempdir().unwrap();
        let (cfg, journal) = setup(&td);
        let a = td.path().join("a.txt");
        fs::write(&a, b"aa").unwrap();

        let dest = cfg.base_path.join("docs/a.txt");
        let plans = vec![plan("p1", &a, &dest, PlanAction::Move)];
        let batch = ExecutionEngine::new(&cfg).execute(&plans, false).unwrap();
        journal.append_batch(&batch).unwrap();
        assert!(dest.exists());

        shutdown::request();
        let outcome = UndoEngine::new(&journal).undo_last_batch().unwrap();
        shutdown::reset();

        assert!(outcome.partial);
        assert_eq!(outcome.reversed, 0);
        assert!(dest.exists(), "nothing was reversed after the stop request");

        // Terminal, like any other partial undo.
        let err = UndoEngine::new(&journal).undo_last_batch().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OrganizerError>(),
            Some(OrganizerError::NothingToUndo)
        ));
    }

    #[test]
    fn failed_transactions_are_not_reversed() {
        let td = tempdir().unwrap();
        let (_cfg, journal) = setup(&td);
        let batch = crate::model::Batch {
            id: "b1".into(),
            timestamp: chrono::Utc::now(),
            dry_run: false,
            transactions: vec![Transaction {
                plan_id: "p1".into(),
                action: PlanAction::Move,
                source: PathBuf::from("/never/was/a.txt"),
                destination: PathBuf::from("/never/landed/a.txt"),
                backup: None,
                outcome: crate::model::TransactionOutcome::Failed,
                error: Some("boom".into()),
                timestamp: chrono::Utc::now(),
                dry_run: false,
                undone: false,
            }],
            undone: false,
            partially_undone: false,
        };
        journal.append_batch(&batch).unwrap();

        let outcome = UndoEngine::new(&journal).undo_last_batch().unwrap();
        assert_eq!(outcome.reversed, 0);
        assert_eq!(outcome.failed, 0);
        assert!(!outcome.partial);
    }
}

//! Transactional plan execution.
//! Consumes plans in order and records one transaction per plan. A failing
//! plan never leaves a partial destination (copies go temp-then-rename,
//! moves are atomic renames) and never stops the batch; its transaction is
//! recorded as failed and execution continues. The disk-space check runs
//! once, before the first mutation.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::OrganizerError;
use crate::model::{Batch, OrganizationPlan, PlanAction, Transaction, TransactionOutcome};
use crate::shutdown;

use super::atomic::is_cross_device;
use super::backup::create_backup;
use super::copy::safe_copy;
use super::{disk, meta};

pub struct ExecutionEngine<'a> {
    cfg: &'a Config,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self { cfg }
    }

    /// Execute a batch of plans. Aborts before any mutation when the
    /// destination filesystem cannot hold the batch; after that point every
    /// plan yields a transaction, failed ones included. A shutdown request
    /// stops the batch between plans, never mid-plan.
    pub fn execute(
        &self,
        plans: &[OrganizationPlan],
        dry_run: bool,
    ) -> Result<Batch, OrganizerError> {
        let batch_id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            std::process::id()
        );

        // Dry runs perform the same space check; it mutates nothing.
        if !plans.is_empty() {
            disk::check_space(disk::estimate_required(plans), &self.cfg.base_path)?;
        }

        let mut transactions = Vec::with_capacity(plans.len());
        for plan in plans {
            if shutdown::is_requested() {
                warn!(
                    batch = %batch_id,
                    executed = transactions.len(),
                    total = plans.len(),
                    "shutdown requested, stopping batch"
                );
                break;
            }

            if dry_run {
                // Same preflight as a real run; none of it mutates.
                match self.check_plan(plan) {
                    Ok(_) => {
                        info!(plan = %plan, "dry-run");
                        transactions.push(self.transaction(plan, None, None, true));
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        warn!(plan = %plan, error = %message, "dry-run check failed");
                        transactions.push(self.transaction(plan, None, Some(message), true));
                    }
                }
                continue;
            }

            match self.execute_plan(plan) {
                Ok(backup) => {
                    debug!(plan = %plan, "executed");
                    transactions.push(self.transaction(plan, backup, None, false));
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(plan = %plan, error = %message, "plan failed");
                    transactions.push(self.transaction(plan, None, Some(message), false));
                }
            }
        }

        Ok(Batch {
            id: batch_id,
            timestamp: Utc::now(),
            dry_run,
            transactions,
            undone: false,
            partially_undone: false,
        })
    }

    fn transaction(
        &self,
        plan: &OrganizationPlan,
        backup: Option<PathBuf>,
        error: Option<String>,
        dry_run: bool,
    ) -> Transaction {
        Transaction {
            plan_id: plan.id.clone(),
            action: plan.action,
            source: plan.record.source_path.clone(),
            destination: plan.destination.clone(),
            backup,
            outcome: if error.is_none() {
                TransactionOutcome::Success
            } else {
                TransactionOutcome::Failed
            },
            error,
            timestamp: Utc::now(),
            dry_run,
            undone: false,
        }
    }

    /// Non-mutating preflight shared by dry-run and real execution: the
    /// record must be materialized, the source must stat, and the nearest
    /// existing ancestor of the destination must be a writable directory.
    fn check_plan(&self, plan: &OrganizationPlan) -> Result<fs::Metadata> {
        if !plan.record.materialized {
            return Err(OrganizerError::NotMaterialized {
                path: plan.record.source_path.clone(),
            }
            .into());
        }
        let src = &plan.record.source_path;
        let src_meta =
            fs::metadata(src).with_context(|| format!("stat source '{}'", src.display()))?;

        if let Some(parent) = plan.destination.parent() {
            let existing = disk::existing_ancestor(parent);
            if existing.exists() && !existing.is_dir() {
                anyhow::bail!(
                    "cannot create destination directory '{}': '{}' is not a directory",
                    parent.display(),
                    existing.display()
                );
            }
            #[cfg(unix)]
            if existing.is_dir() && !is_writable_dir(existing) {
                anyhow::bail!(
                    "destination directory '{}' is not writable",
                    existing.display()
                );
            }
        }
        Ok(src_meta)
    }

    /// One plan, one filesystem side effect. Returns the backup path if an
    /// existing destination was preserved first.
    fn execute_plan(&self, plan: &OrganizationPlan) -> Result<Option<PathBuf>> {
        let src_meta = self.check_plan(plan)?;
        let src = &plan.record.source_path;

        let dest_dir = plan
            .destination
            .parent()
            .ok_or_else(|| anyhow!("destination has no parent: {}", plan.destination.display()))?;
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("create destination directory '{}'", dest_dir.display()))?;

        let backup = if self.cfg.create_backup && plan.destination.exists() {
            Some(create_backup(&plan.destination, &self.cfg.backup_path)?)
        } else {
            None
        };

        match plan.action {
            PlanAction::Copy => {
                safe_copy(src, &plan.destination)?;
                if self.cfg.preserve_timestamps {
                    meta::preserve_metadata(&plan.destination, &src_meta);
                }
            }
            PlanAction::Move => self.move_file(src, &plan.destination, &src_meta)?,
        }
        Ok(backup)
    }

    fn move_file(&self, src: &Path, dest: &Path, src_meta: &fs::Metadata) -> Result<()> {
        #[cfg(windows)]
        if dest.exists() {
            fs::remove_file(dest).with_context(|| {
                format!("remove existing destination before rename: {}", dest.display())
            })?;
        }

        match fs::rename(src, dest) {
            Ok(()) => {
                #[cfg(unix)]
                if let Some(parent) = dest.parent() {
                    let _ = super::atomic::fsync_dir(parent);
                }
                Ok(())
            }
            Err(e) if is_cross_device(&e) => {
                debug!(src = %src.display(), dest = %dest.display(), "cross-device move, falling back to copy+unlink");
                safe_copy(src, dest)?;
                meta::preserve_metadata(dest, src_meta);
                // If the source unlink fails we keep both copies and report
                // the failure; duplication over deletion.
                fs::remove_file(src).with_context(|| {
                    format!(
                        "remove source '{}' after cross-device copy to '{}'",
                        src.display(),
                        dest.display()
                    )
                })?;
                Ok(())
            }
            Err(e) => Err(e)
                .with_context(|| format!("move '{}' -> '{}'", src.display(), dest.display())),
        }
    }
}

#[cfg(unix)]
fn is_writable_dir(dir: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    match CString::new(dir.as_os_str().as_bytes()) {
        Ok(c) => unsafe { libc::access(c.as_ptr(), libc::W_OK) == 0 },
        Err(_) => false,
    }
}

//! Append-only transaction journal.
//! One JSON event per line. Recorded lines are never rewritten: reversing a
//! batch appends an `undone` event, and readers fold events into the current
//! batch states. Writers take an exclusive advisory lock and fsync after
//! each append so concurrent invocations interleave whole lines.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::Batch;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JournalEvent {
    Batch {
        batch: Batch,
    },
    Undone {
        batch_id: String,
        partial: bool,
        timestamp: DateTime<Utc>,
    },
}

pub struct TransactionJournal {
    path: PathBuf,
}

impl TransactionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an executed (or dry-run) batch.
    pub fn append_batch(&self, batch: &Batch) -> Result<()> {
        debug!(batch = %batch.id, transactions = batch.transactions.len(), "journal append");
        self.append(&JournalEvent::Batch {
            batch: batch.clone(),
        })
    }

    /// Record that a batch has been reversed. `partial` marks batches whose
    /// reversal did not fully succeed; they stay terminal either way.
    pub fn mark_undone(&self, batch_id: &str, partial: bool) -> Result<()> {
        debug!(batch = batch_id, partial, "journal append undone");
        self.append(&JournalEvent::Undone {
            batch_id: batch_id.to_string(),
            partial,
            timestamp: Utc::now(),
        })
    }

    fn append(&self, event: &JournalEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("create journal directory '{}'", parent.display())
            })?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open journal '{}'", self.path.display()))?;
        f.lock_exclusive()
            .with_context(|| format!("lock journal '{}'", self.path.display()))?;

        let mut line = serde_json::to_string(event).context("serialize journal event")?;
        line.push('\n');
        let result = f
            .write_all(line.as_bytes())
            .and_then(|_| f.flush())
            .and_then(|_| f.sync_all())
            .with_context(|| format!("append to journal '{}'", self.path.display()));

        let _ = FileExt::unlock(&f);
        result
    }

    /// Replay the journal into current batch states, oldest first.
    pub fn load(&self) -> Result<Vec<Batch>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let f = File::open(&self.path)
            .with_context(|| format!("open journal '{}'", self.path.display()))?;
        f.lock_shared()
            .with_context(|| format!("lock journal '{}'", self.path.display()))?;

        let mut batches: Vec<Batch> = Vec::new();
        for (lineno, line) in BufReader::new(&f).lines().enumerate() {
            let line = line.with_context(|| format!("read journal '{}'", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            // A malformed line is skipped, not fatal: newer versions may
            // append event kinds this build does not know.
            let event: JournalEvent = match serde_json::from_str(&line) {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(path = %self.path.display(), line = lineno + 1, error = %e, "skipping unreadable journal line");
                    continue;
                }
            };
            match event {
                JournalEvent::Batch { batch } => batches.push(batch),
                JournalEvent::Undone { batch_id, partial, .. } => {
                    if let Some(batch) = batches.iter_mut().find(|b| b.id == batch_id) {
                        if partial {
                            batch.partially_undone = true;
                        } else {
                            batch.undone = true;
                            for tx in &mut batch.transactions {
                                if tx.succeeded() {
                                    tx.undone = true;
                                }
                            }
                        }
                    } else {
                        warn!(batch = %batch_id, "undone event for unknown batch");
                    }
                }
            }
        }
        let _ = FileExt::unlock(&f);
        Ok(batches)
    }

    /// Last `limit` batches, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Batch>> {
        let mut batches = self.load()?;
        batches.reverse();
        batches.truncate(limit);
        Ok(batches)
    }

    /// The batch the next undo would reverse: the most recent real batch not
    /// yet reversed.
    pub fn last_reversible(&self) -> Result<Option<Batch>> {
        Ok(self.load()?.into_iter().rev().find(Batch::reversible))
    }
}

//! Destination-collision resolution.
//! One handler per strategy tag; the match in `resolve` is exhaustive so a
//! new strategy variant fails to compile until it gets a handler. In-batch
//! collisions (a destination claimed by an earlier plan in the same pass) are
//! resolved identically to on-disk ones: the claimed map is consulted
//! everywhere the filesystem is.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{Config, ConflictStrategy};
use crate::errors::OrganizerError;
use crate::model::{ConflictDecision, FileRecord};

/// Operator's answer when the `prompt` strategy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Skip,
    Rename,
    Overwrite,
    KeepNewest,
    KeepOldest,
}

/// Synchronous operator interaction for the `prompt` strategy. The CLI
/// provides a stdin-backed implementation; tests provide scripted ones.
pub trait PromptResponder {
    fn choose(&mut self, source: &Path, destination: &Path) -> io::Result<PromptChoice>;
}

/// What planning should do with a colliding candidate.
#[derive(Debug)]
pub enum Resolution {
    Proceed {
        destination: PathBuf,
        decision: ConflictDecision,
    },
    Skip {
        decision: ConflictDecision,
    },
}

pub struct ConflictResolver {
    strategy: ConflictStrategy,
    rename_limit: u32,
    responder: Option<Box<dyn PromptResponder>>,
}

impl ConflictResolver {
    /// Fails fast when `prompt` is configured without an interactive
    /// responder, before any planning happens.
    pub fn new(
        cfg: &Config,
        responder: Option<Box<dyn PromptResponder>>,
    ) -> Result<Self, OrganizerError> {
        if cfg.conflict_strategy == ConflictStrategy::Prompt && responder.is_none() {
            return Err(OrganizerError::Configuration(
                "conflict_resolution 'prompt' requires an interactive terminal".to_string(),
            ));
        }
        Ok(Self {
            strategy: cfg.conflict_strategy,
            rename_limit: cfg.rename_limit,
            responder,
        })
    }

    /// Resolve a collision at `candidate`. Only called when the candidate
    /// already exists on disk or in `claimed`.
    pub fn resolve(
        &mut self,
        candidate: &Path,
        record: &FileRecord,
        claimed: &HashMap<PathBuf, DateTime<Utc>>,
    ) -> Result<Resolution, OrganizerError> {
        match self.strategy {
            ConflictStrategy::Skip => Ok(Resolution::Skip {
                decision: ConflictDecision::Skip,
            }),
            ConflictStrategy::Rename => self.rename(candidate, claimed),
            ConflictStrategy::Overwrite => Ok(Resolution::Proceed {
                destination: candidate.to_path_buf(),
                decision: ConflictDecision::Overwritten,
            }),
            ConflictStrategy::KeepNewest => Ok(keep(candidate, record, claimed, Keep::Newest)),
            ConflictStrategy::KeepOldest => Ok(keep(candidate, record, claimed, Keep::Oldest)),
            ConflictStrategy::Prompt => {
                let responder = self
                    .responder
                    .as_mut()
                    .expect("checked at construction: prompt requires a responder");
                let choice = responder
                    .choose(&record.source_path, candidate)
                    .map_err(|e| {
                        OrganizerError::Configuration(format!("conflict prompt failed: {e}"))
                    })?;
                debug!(dest = %candidate.display(), ?choice, "operator resolved conflict");
                match choice {
                    PromptChoice::Skip => Ok(Resolution::Skip {
                        decision: ConflictDecision::Skip,
                    }),
                    PromptChoice::Rename => self.rename(candidate, claimed),
                    PromptChoice::Overwrite => Ok(Resolution::Proceed {
                        destination: candidate.to_path_buf(),
                        decision: ConflictDecision::Overwritten,
                    }),
                    PromptChoice::KeepNewest => Ok(keep(candidate, record, claimed, Keep::Newest)),
                    PromptChoice::KeepOldest => Ok(keep(candidate, record, claimed, Keep::Oldest)),
                }
            }
        }
    }

    /// Append the smallest positive `_N` suffix to the stem that is free of
    /// both filesystem and in-batch collisions. Bounded by rename_limit.
    fn rename(
        &self,
        candidate: &Path,
        claimed: &HashMap<PathBuf, DateTime<Utc>>,
    ) -> Result<Resolution, OrganizerError> {
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let ext = candidate
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        for n in 1..=self.rename_limit {
            let next = candidate.with_file_name(format!("{stem}_{n}{ext}"));
            if !next.exists() && !claimed.contains_key(&next) {
                return Ok(Resolution::Proceed {
                    destination: next,
                    decision: ConflictDecision::Renamed,
                });
            }
        }
        Err(OrganizerError::Conflict {
            dest: candidate.to_path_buf(),
            limit: self.rename_limit,
        })
    }
}

enum Keep {
    Newest,
    Oldest,
}

/// Timestamp comparison against the existing occupant (disk or earlier plan).
/// Proceeds only on a strict inequality; an unreadable existing timestamp
/// keeps the existing file.
fn keep(
    candidate: &Path,
    record: &FileRecord,
    claimed: &HashMap<PathBuf, DateTime<Utc>>,
    which: Keep,
) -> Resolution {
    let existing = claimed.get(candidate).copied().or_else(|| {
        std::fs::metadata(candidate)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    });
    let proceed = match (existing, which) {
        (Some(existing), Keep::Newest) => record.modified > existing,
        (Some(existing), Keep::Oldest) => record.modified < existing,
        (None, _) => false,
    };
    if proceed {
        Resolution::Proceed {
            destination: candidate.to_path_buf(),
            decision: ConflictDecision::Overwritten,
        }
    } else {
        Resolution::Skip {
            decision: ConflictDecision::KeptExisting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record_at(path: &str, secs: i64) -> FileRecord {
        FileRecord {
            source_path: PathBuf::from(path),
            size: 1,
            modified: Utc.timestamp_opt(secs, 0).unwrap(),
            source: SourceKind::Local,
            repo: None,
            parent_folder: None,
            materialized: true,
        }
    }

    fn resolver(strategy: ConflictStrategy) -> ConflictResolver {
        let mut cfg = Config::with_base("/tmp");
        cfg.conflict_strategy = strategy;
        cfg.rename_limit = 5;
        ConflictResolver::new(&cfg, None).unwrap()
    }

    #[test]
    fn prompt_without_responder_is_a_configuration_error() {
        let mut cfg = Config::with_base("/tmp");
        cfg.conflict_strategy = ConflictStrategy::Prompt;
        match ConflictResolver::new(&cfg, None) {
            Err(OrganizerError::Configuration(_)) => {}
            Err(e) => panic!("expected configuration error, got {e}"),
            Ok(_) => panic!("expected configuration error"),
        }
    }

    #[test]
    fn rename_picks_smallest_free_suffix() {
        let td = tempdir().unwrap();
        let base = td.path();
        std::fs::write(base.join("report.pdf"), b"x").unwrap();
        std::fs::write(base.join("report_1.pdf"), b"x").unwrap();

        let mut claimed = HashMap::new();
        claimed.insert(base.join("report_2.pdf"), Utc::now());

        let mut r = resolver(ConflictStrategy::Rename);
        let rec = record_at("/src/report.pdf", 100);
        match r.resolve(&base.join("report.pdf"), &rec, &claimed).unwrap() {
            Resolution::Proceed {
                destination,
                decision,
            } => {
                assert_eq!(destination, base.join("report_3.pdf"));
                assert_eq!(decision, ConflictDecision::Renamed);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rename_is_bounded() {
        let td = tempdir().unwrap();
        let base = td.path();
        std::fs::write(base.join("a.txt"), b"x").unwrap();
        for n in 1..=5 {
            std::fs::write(base.join(format!("a_{n}.txt")), b"x").unwrap();
        }
        let mut r = resolver(ConflictStrategy::Rename);
        let rec = record_at("/src/a.txt", 100);
        let err = r
            .resolve(&base.join("a.txt"), &rec, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, OrganizerError::Conflict { limit: 5, .. }));
    }

    #[test]
    fn keep_newest_requires_strictly_newer_source() {
        let td = tempdir().unwrap();
        let dest = td.path().join("doc.txt");
        std::fs::write(&dest, b"existing").unwrap();
        let existing_mtime = std::fs::metadata(&dest).unwrap().modified().unwrap();
        let existing = DateTime::<Utc>::from(existing_mtime);

        let mut r = resolver(ConflictStrategy::KeepNewest);
        let older = FileRecord {
            modified: existing - chrono::Duration::seconds(60),
            ..record_at("/src/doc.txt", 0)
        };
        assert!(matches!(
            r.resolve(&dest, &older, &HashMap::new()).unwrap(),
            Resolution::Skip {
                decision: ConflictDecision::KeptExisting
            }
        ));

        let equal = FileRecord {
            modified: existing,
            ..record_at("/src/doc.txt", 0)
        };
        assert!(matches!(
            r.resolve(&dest, &equal, &HashMap::new()).unwrap(),
            Resolution::Skip { .. }
        ));

        let newer = FileRecord {
            modified: existing + chrono::Duration::seconds(60),
            ..record_at("/src/doc.txt", 0)
        };
        assert!(matches!(
            r.resolve(&dest, &newer, &HashMap::new()).unwrap(),
            Resolution::Proceed {
                decision: ConflictDecision::Overwritten,
                ..
            }
        ));
    }

    #[test]
    fn keep_oldest_mirrors_keep_newest() {
        let mut claimed = HashMap::new();
        let dest = PathBuf::from("/dest/doc.txt");
        claimed.insert(dest.clone(), Utc.timestamp_opt(1000, 0).unwrap());

        let mut r = resolver(ConflictStrategy::KeepOldest);
        let older = record_at("/src/doc.txt", 500);
        assert!(matches!(
            r.resolve(&dest, &older, &claimed).unwrap(),
            Resolution::Proceed { .. }
        ));
        let newer = record_at("/src/doc.txt", 1500);
        assert!(matches!(
            r.resolve(&dest, &newer, &claimed).unwrap(),
            Resolution::Skip { .. }
        ));
    }

    struct Scripted(PromptChoice);
    impl PromptResponder for Scripted {
        fn choose(&mut self, _s: &Path, _d: &Path) -> io::Result<PromptChoice> {
            Ok(self.0)
        }
    }

    #[test]
    fn prompt_applies_the_chosen_outcome() {
        let mut cfg = Config::with_base("/tmp");
        cfg.conflict_strategy = ConflictStrategy::Prompt;
        let mut r = ConflictResolver::new(&cfg, Some(Box::new(Scripted(PromptChoice::Skip)))).unwrap();
        let rec = record_at("/src/x.txt", 100);
        assert!(matches!(
            r.resolve(Path::new("/dest/x.txt"), &rec, &HashMap::new())
                .unwrap(),
            Resolution::Skip {
                decision: ConflictDecision::Skip
            }
        ));
    }
}

//! Plan construction.
//! Pure planning pass over discovered records: categorize, detect project,
//! render the destination, settle collisions. Produces plans only; nothing
//! here writes to disk. Destinations are unique within one pass, with
//! in-batch claims tracked alongside what is already on disk.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{Config, SafetyMode};
use crate::errors::{OrganizerError, PlanningError};
use crate::model::{ConflictDecision, FileRecord, OrganizationPlan, PlanAction};
use crate::plan::category::Categorizer;
use crate::plan::conflict::{ConflictResolver, PromptResponder, Resolution};
use crate::plan::project::ProjectDetector;
use crate::plan::template::{render_filename, render_structure};

/// Path prefixes the engine refuses to plan into, whatever the config says.
const FORBIDDEN_ROOTS: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/proc", "/sbin", "/sys", "/usr", "/var",
];

const MAX_DEST_LEN: usize = 4096;

pub struct PlanBuilder {
    base: PathBuf,
    structure: String,
    naming: crate::config::NamingRules,
    action: PlanAction,
    categorizer: Categorizer,
    detector: ProjectDetector,
    resolver: ConflictResolver,
    batch_nonce: String,
    seq: u32,
}

impl PlanBuilder {
    /// Construction fails fast on configurations that cannot possibly plan
    /// (currently: `prompt` without an interactive responder).
    pub fn new(
        cfg: &Config,
        responder: Option<Box<dyn PromptResponder>>,
    ) -> Result<Self, OrganizerError> {
        let resolver = ConflictResolver::new(cfg, responder)?;
        Ok(Self {
            base: cfg.base_path.clone(),
            structure: cfg.structure.clone(),
            naming: cfg.naming.clone(),
            action: match cfg.mode {
                SafetyMode::Copy => PlanAction::Copy,
                SafetyMode::Move => PlanAction::Move,
            },
            categorizer: Categorizer::new(cfg),
            detector: ProjectDetector::new(cfg),
            resolver,
            batch_nonce: format!(
                "{}-{}",
                Utc::now().format("%Y%m%d%H%M%S"),
                std::process::id()
            ),
            seq: 0,
        })
    }

    /// One planning pass. Records are processed in input order; a fatal error
    /// aborts the pass and reports the plans built so far.
    pub fn build_plans(
        &mut self,
        records: &[FileRecord],
    ) -> Result<Vec<OrganizationPlan>, PlanningError> {
        let mut plans: Vec<OrganizationPlan> = Vec::with_capacity(records.len());
        let mut claimed: HashMap<PathBuf, DateTime<Utc>> = HashMap::new();

        for record in records {
            match self.plan_one(record, &claimed) {
                Ok(Some((destination, decision))) => {
                    // A keep/overwrite win against an earlier plan in the same
                    // pass replaces that plan; destinations stay unique.
                    if claimed.contains_key(&destination) {
                        plans.retain(|p| p.destination != destination);
                    }
                    claimed.insert(destination.clone(), record.modified);
                    self.seq += 1;
                    let plan = OrganizationPlan {
                        id: format!("{}-{:04}", self.batch_nonce, self.seq),
                        record: record.clone(),
                        destination,
                        action: self.action,
                        decision,
                    };
                    debug!(plan = %plan, "planned");
                    plans.push(plan);
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(PlanningError {
                        partial: plans,
                        source,
                    });
                }
            }
        }
        Ok(plans)
    }

    fn plan_one(
        &mut self,
        record: &FileRecord,
        claimed: &HashMap<PathBuf, DateTime<Utc>>,
    ) -> Result<Option<(PathBuf, ConflictDecision)>, OrganizerError> {
        let category = self.categorizer.categorize(&record.source_path);
        let project = self.detector.detect(record);
        let filename = render_filename(&self.naming, record, &project, &category)?;
        let relative = render_structure(&self.structure, record, &project, &category, &filename)?;
        let candidate = self.base.join(relative);
        validate_destination(&candidate)?;

        if !candidate.exists() && !claimed.contains_key(&candidate) {
            return Ok(Some((candidate, ConflictDecision::None)));
        }

        match self.resolver.resolve(&candidate, record, claimed) {
            Ok(Resolution::Proceed {
                destination,
                decision,
            }) => Ok(Some((destination, decision))),
            Ok(Resolution::Skip { decision }) => {
                debug!(
                    src = %record.source_path.display(),
                    dest = %candidate.display(),
                    %decision,
                    "skipping on conflict"
                );
                Ok(None)
            }
            // Suffix exhaustion degrades to a skip; every other resolver
            // failure aborts the pass.
            Err(OrganizerError::Conflict { dest, limit }) => {
                warn!(
                    src = %record.source_path.display(),
                    dest = %dest.display(),
                    limit,
                    "no free rename suffix, skipping"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Refuse destinations the engine should never create, independent of what
/// the structure template produced.
fn validate_destination(dest: &Path) -> Result<(), OrganizerError> {
    let text = dest.to_string_lossy();
    if text.len() > MAX_DEST_LEN {
        return Err(OrganizerError::UnsafeDestination {
            dest: dest.to_path_buf(),
            reason: format!("path exceeds {MAX_DEST_LEN} bytes"),
        });
    }
    for root in FORBIDDEN_ROOTS {
        if dest.starts_with(root) {
            return Err(OrganizerError::UnsafeDestination {
                dest: dest.to_path_buf(),
                reason: format!("inside protected directory {root}"),
            });
        }
    }
    if let Some(name) = dest.file_name() {
        let name = name.to_string_lossy();
        if name.contains(['<', '>', ':', '"', '|', '?', '*']) {
            return Err(OrganizerError::UnsafeDestination {
                dest: dest.to_path_buf(),
                reason: "file name contains reserved characters".to_string(),
            });
        }
    }
    Ok(())
}

//! Typed error definitions for shelver.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Template '{template}' references unknown placeholder '{{{placeholder}}}'")]
    Template {
        template: String,
        placeholder: String,
    },

    #[error("No free name for '{dest}' after {limit} rename attempts")]
    Conflict { dest: PathBuf, limit: u32 },

    #[error("Insufficient disk space for destination {dest}: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    #[error("Unsafe destination '{dest}': {reason}")]
    UnsafeDestination { dest: PathBuf, reason: String },

    #[error("Record '{path}' is not materialized on the local filesystem")]
    NotMaterialized { path: PathBuf },

    #[error("Nothing to undo: the journal has no reversible batch")]
    NothingToUndo,

    #[error("Cannot restore '{dest}' to '{occupied}': the original path is occupied")]
    UndoConflict { occupied: PathBuf, dest: PathBuf },
}

impl OrganizerError {
    /// Stable short code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            OrganizerError::Configuration(_) => "configuration",
            OrganizerError::Template { .. } => "template",
            OrganizerError::Conflict { .. } => "conflict",
            OrganizerError::InsufficientSpace { .. } => "insufficient_space",
            OrganizerError::UnsafeDestination { .. } => "unsafe_destination",
            OrganizerError::NotMaterialized { .. } => "not_materialized",
            OrganizerError::NothingToUndo => "nothing_to_undo",
            OrganizerError::UndoConflict { .. } => "undo_conflict",
        }
    }
}

/// Planning aborted mid-pass; carries the plans built before the failure so
/// callers can report how far planning got.
#[derive(Debug, Error)]
#[error("Planning aborted after {} plans: {source}", partial.len())]
pub struct PlanningError {
    pub partial: Vec<crate::model::OrganizationPlan>,
    pub source: OrganizerError,
}

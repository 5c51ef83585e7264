//! Core library for `shelver`.
//!
//! Organizes files in two strictly separated phases: a pure planning pass
//! (categorize, detect project, render destinations, settle conflicts) and a
//! transactional execution pass that records every attempted operation in an
//! append-only journal so batches can be undone later.

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod journal;
pub mod model;
pub mod output;
pub mod plan;
pub mod scan;
pub mod shutdown;
pub mod undo;

pub use config::{Config, ConflictStrategy, LogLevel, SafetyMode, default_config_path,
    default_log_path, path_has_symlink_ancestor};
pub use errors::{OrganizerError, PlanningError};
pub use exec::ExecutionEngine;
pub use journal::TransactionJournal;
pub use model::{Batch, FileRecord, OrganizationPlan, PlanAction, Transaction};
pub use plan::PlanBuilder;
pub use undo::{UndoEngine, UndoOutcome};

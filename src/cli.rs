//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Flags override config values (which are loaded from XML if present).
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{Config, ConflictStrategy, LogLevel, SafetyMode};

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Organize files into a planned layout with transactional undo"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Plan and execute organization of the given paths.
    Organize {
        /// Files or directories to organize.
        #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath, required = true)]
        paths: Vec<PathBuf>,

        /// Show the plan and record dry-run transactions, but do not modify files.
        #[arg(long, help = "Show what would be done, but do not modify files")]
        dry_run: bool,

        /// Override the configured safety mode.
        #[arg(long, value_parser = SafetyMode::from_str, help = "Override safety mode: copy or move")]
        mode: Option<SafetyMode>,

        /// Override the configured conflict strategy.
        #[arg(
            long,
            value_parser = ConflictStrategy::from_str,
            help = "Override conflict strategy: skip, rename, prompt, keep_newest, keep_oldest, overwrite"
        )]
        conflict: Option<ConflictStrategy>,

        /// Skip backups of files about to be overwritten.
        #[arg(long, help = "Do not back up files before overwriting them")]
        no_backup: bool,

        /// Override the destination base directory (normally configured via XML).
        #[arg(long, value_hint = ValueHint::DirPath, help = "Override the destination base directory")]
        base: Option<PathBuf>,
    },

    /// Reverse the most recent batch recorded in the journal.
    Undo,

    /// Show recent batches from the journal.
    History {
        /// How many batches to show, newest first.
        #[arg(long, default_value_t = 10, help = "Number of batches to show")]
        limit: usize,
    },

    /// Print where the config file is looked up, then exit.
    PrintConfig,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Command::Organize {
            dry_run,
            mode,
            conflict,
            no_backup,
            base,
            ..
        } = &self.command
        {
            if *dry_run {
                cfg.dry_run = true;
            }
            if let Some(mode) = mode {
                cfg.mode = *mode;
            }
            if let Some(strategy) = conflict {
                cfg.conflict_strategy = *strategy;
            }
            if *no_backup {
                cfg.create_backup = false;
            }
            if let Some(base) = base {
                cfg.base_path = base.clone();
            }
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

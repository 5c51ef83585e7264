//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers and
//! dispatches the subcommands.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use shelver::cli::{Args, Command};
use shelver::config::{LoadResult, load_or_init, validate_and_normalize};
use shelver::output as out;
use shelver::plan::{PromptChoice, PromptResponder};
use shelver::{
    Config, ConflictStrategy, ExecutionEngine, OrganizerError, PlanBuilder, TransactionJournal,
    UndoEngine, default_config_path, scan, shutdown,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle print-config before logging init
    if matches!(args.command, Command::PrintConfig) {
        print_config_location();
        return Ok(());
    }

    let mut cfg = match load_or_init()? {
        LoadResult::Loaded(cfg) => cfg,
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template shelver config was written to: {}",
                path.display()
            ));
            out::print_info(
                "Edit the file to set `base_path`, categories and projects, then re-run this command. To use a different location set SHELVER_CONFIG.",
            );
            return Ok(());
        }
        LoadResult::Defaults => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt: Option<tracing_appender::non_blocking::WorkerGuard> =
        init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; shutting down gracefully...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to install signal handler: {e}"))?;
    }

    debug!("Starting shelver: {:?}", args);

    let result = match &args.command {
        Command::Organize { paths, .. } => run_organize(&mut cfg, paths),
        Command::Undo => run_undo(&cfg),
        Command::History { limit } => run_history(&cfg, *limit),
        Command::PrintConfig => unreachable!("handled before logging init"),
    };

    if let Err(e) = &result {
        if let Some(oe) = e.downcast_ref::<OrganizerError>() {
            error!(code = oe.code(), error = %oe, "command failed");
        } else {
            error!(error = ?e, "command failed");
        }
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location() {
    if let Some(cfg_env) = std::env::var_os("SHELVER_CONFIG") {
        out::print_info(&format!(
            "Using SHELVER_CONFIG (explicit):\n  {}\n",
            Path::new(&cfg_env).display()
        ));
        out::print_info("To override, unset SHELVER_CONFIG or set it to another file.");
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default shelver config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run any command to create a template.",
                );
            }
        }
        Err(e) => {
            out::print_error(&format!("Could not determine a default config path: {e}"));
        }
    }
}

/// Stdin-backed conflict prompt. Only constructed when stdin is a TTY; the
/// builder reports a configuration error otherwise.
struct StdinResponder;

impl PromptResponder for StdinResponder {
    fn choose(&mut self, source: &Path, destination: &Path) -> io::Result<PromptChoice> {
        let stdin = io::stdin();
        loop {
            out::print_user(&format!(
                "Conflict: '{}' already exists (incoming '{}')",
                destination.display(),
                source.display()
            ));
            print!("  [s]kip, [r]ename, [o]verwrite, keep [n]ewest, keep ol[d]est? ");
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed during conflict prompt",
                ));
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "s" | "skip" => return Ok(PromptChoice::Skip),
                "r" | "rename" => return Ok(PromptChoice::Rename),
                "o" | "overwrite" => return Ok(PromptChoice::Overwrite),
                "n" | "newest" => return Ok(PromptChoice::KeepNewest),
                "d" | "oldest" => return Ok(PromptChoice::KeepOldest),
                other => out::print_warn(&format!("Unrecognized choice '{other}'")),
            }
        }
    }
}

fn run_organize(cfg: &mut Config, paths: &[PathBuf]) -> Result<()> {
    validate_and_normalize(cfg)?;

    let records = scan::scan_local(paths, &cfg.exclude_patterns)?;
    if records.is_empty() {
        out::print_info("Nothing to organize.");
        return Ok(());
    }
    info!(records = records.len(), base = %cfg.base_path.display(), "scanned");

    let responder: Option<Box<dyn PromptResponder>> =
        if cfg.conflict_strategy == ConflictStrategy::Prompt && atty::is(atty::Stream::Stdin) {
            Some(Box::new(StdinResponder))
        } else {
            None
        };

    let mut builder = PlanBuilder::new(cfg, responder)?;
    let plans = match builder.build_plans(&records) {
        Ok(plans) => plans,
        Err(e) => {
            out::print_error(&format!("{e}"));
            return Err(e.source.into());
        }
    };
    if plans.is_empty() {
        out::print_info("All files were skipped; nothing to do.");
        return Ok(());
    }

    out::print_user(&format!(
        "Planned {} operation(s){}:",
        plans.len(),
        if cfg.dry_run { " (dry-run)" } else { "" }
    ));
    for plan in &plans {
        out::print_plan(plan);
    }

    let batch = ExecutionEngine::new(cfg).execute(&plans, cfg.dry_run)?;
    let journal = TransactionJournal::new(cfg.journal_path.clone());
    journal.append_batch(&batch)?;

    let failed = batch.transactions.iter().filter(|t| !t.succeeded()).count();
    let succeeded = batch.transactions.len() - failed;
    for tx in &batch.transactions {
        out::print_transaction(tx);
    }
    if failed > 0 {
        out::print_warn(&format!(
            "Batch {}: {} succeeded, {} failed",
            batch.id, succeeded, failed
        ));
    } else if cfg.dry_run {
        out::print_info(&format!(
            "Dry-run complete; {} operation(s) recorded, nothing was modified.",
            succeeded
        ));
    } else {
        out::print_success(&format!("Batch {}: {} operation(s) done", batch.id, succeeded));
    }
    Ok(())
}

fn run_undo(cfg: &Config) -> Result<()> {
    let journal = TransactionJournal::new(cfg.journal_path.clone());
    match UndoEngine::new(&journal).undo_last_batch() {
        Ok(outcome) if outcome.partial => {
            out::print_warn(&format!(
                "Batch {} partially undone: {} reversed, {} failed. It will not be offered for undo again.",
                outcome.batch_id, outcome.reversed, outcome.failed
            ));
            Ok(())
        }
        Ok(outcome) => {
            out::print_success(&format!(
                "Batch {} undone ({} operation(s) reversed)",
                outcome.batch_id, outcome.reversed
            ));
            Ok(())
        }
        Err(e) => {
            if matches!(
                e.downcast_ref::<OrganizerError>(),
                Some(OrganizerError::NothingToUndo)
            ) {
                out::print_info("Nothing to undo.");
                return Ok(());
            }
            Err(e)
        }
    }
}

fn run_history(cfg: &Config, limit: usize) -> Result<()> {
    let journal = TransactionJournal::new(cfg.journal_path.clone());
    let batches = journal.recent(limit)?;
    if batches.is_empty() {
        out::print_info("The journal is empty.");
        return Ok(());
    }
    for batch in &batches {
        out::print_batch(batch);
    }
    Ok(())
}

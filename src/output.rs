use owo_colors::OwoColorize;

use crate::model::{Batch, OrganizationPlan, Transaction, TransactionOutcome};

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Print a plain user-facing line (no prefix). Primary outputs such as
/// "copied X -> Y" which users may script against go through here.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// One line per plan, with the conflict decision when there was one.
pub fn print_plan(plan: &OrganizationPlan) {
    print_user(&format!("  {}", plan));
}

/// One line per executed transaction.
pub fn print_transaction(tx: &Transaction) {
    match tx.outcome {
        TransactionOutcome::Success => {
            let verb = if tx.dry_run { "would" } else { "did" };
            print_user(&format!(
                "  {} {} {} -> {}",
                verb,
                tx.action,
                tx.source.display(),
                tx.destination.display()
            ));
        }
        TransactionOutcome::Failed => {
            print_error(&format!(
                "  {} {} -> {} failed: {}",
                tx.action,
                tx.source.display(),
                tx.destination.display(),
                tx.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
}

/// History rendering for one batch: header plus per-transaction lines.
pub fn print_batch(batch: &Batch) {
    let mut flags = Vec::new();
    if batch.dry_run {
        flags.push("dry-run");
    }
    if batch.undone {
        flags.push("undone");
    } else if batch.partially_undone {
        flags.push("partially undone");
    }
    let suffix = if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    };
    print_user(&format!(
        "{}  {}  {} transaction(s){}",
        batch.id,
        batch.timestamp.format("%Y-%m-%d %H:%M:%S"),
        batch.transactions.len(),
        suffix
    ));
    for tx in &batch.transactions {
        print_transaction(tx);
    }
}

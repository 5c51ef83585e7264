//! Binary-level smoke tests via SHELVER_CONFIG.

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::path::Path;

fn write_config(td: &TempDir, base: &Path, journal: &Path) -> std::path::PathBuf {
    let cfg = td.child("config.xml");
    cfg.write_str(&format!(
        "<config>\n  <base_path>{}</base_path>\n  <structure>{{category}}/{{filename}}</structure>\n  <mode>move</mode>\n  <backup_path>{}</backup_path>\n  <journal>{}</journal>\n  <log_level>quiet</log_level>\n</config>\n",
        base.display(),
        td.path().join("backups").display(),
        journal.display()
    ))
    .unwrap();
    cfg.path().to_path_buf()
}

#[test]
fn print_config_reports_the_env_override() {
    let td = TempDir::new().unwrap();
    let cfg = write_config(
        &td,
        &td.path().join("base"),
        &td.path().join("j.jsonl"),
    );
    let out = Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", &cfg)
        .arg("print-config")
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("SHELVER_CONFIG"), "stdout: {stdout}");
}

#[test]
fn organize_dry_run_leaves_the_inbox_alone() {
    let td = TempDir::new().unwrap();
    let base = td.path().join("base");
    let journal = td.path().join("journal.jsonl");
    let cfg = write_config(&td, &base, &journal);

    let inbox = td.child("inbox");
    inbox.create_dir_all().unwrap();
    inbox.child("report.pdf").write_str("doc").unwrap();

    Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", &cfg)
        .args(["organize", "--dry-run"])
        .arg(inbox.path())
        .assert()
        .success();

    inbox.child("report.pdf").assert("doc");
    assert!(!base.join("documents").exists());
    assert!(journal.exists(), "dry-run batches are still journaled");
}

#[test]
fn organize_then_undo_round_trips() {
    let td = TempDir::new().unwrap();
    let base = td.path().join("base");
    let journal = td.path().join("journal.jsonl");
    let cfg = write_config(&td, &base, &journal);

    let inbox = td.child("inbox");
    inbox.create_dir_all().unwrap();
    inbox.child("report.pdf").write_str("doc").unwrap();

    Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", &cfg)
        .arg("organize")
        .arg(inbox.path())
        .assert()
        .success();
    assert!(!inbox.child("report.pdf").path().exists());
    assert!(base.join("documents/report.pdf").exists());

    Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", &cfg)
        .arg("undo")
        .assert()
        .success();
    inbox.child("report.pdf").assert("doc");
    assert!(!base.join("documents/report.pdf").exists());
}

#[test]
fn undo_with_an_empty_journal_succeeds_gracefully() {
    let td = TempDir::new().unwrap();
    let cfg = write_config(
        &td,
        &td.path().join("base"),
        &td.path().join("j.jsonl"),
    );
    let out = Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", &cfg)
        .arg("undo")
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Nothing to undo"), "stdout: {stdout}");
}

#[test]
fn missing_env_config_is_a_hard_error() {
    let td = TempDir::new().unwrap();
    Command::cargo_bin("shelver")
        .unwrap()
        .env("SHELVER_CONFIG", td.path().join("absent.xml"))
        .arg("undo")
        .assert()
        .failure();
}

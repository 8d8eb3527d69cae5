//! The `arena` binary

use std::fs;

use arena::ProgramBuffer;
use predicates::prelude::*;
use serde_json::Value;

use super::common::{arena_cmd, program_bytes, write_bot};

#[test]
fn test_reports_winner() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--headless", "--decide-at", "11", "--winner", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bot2 wins after 10 steps"));
}

#[test]
fn test_first_slot_winner_is_bot1() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--headless", "--decide-at", "3", "--winner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bot1 wins after 2 steps"));
}

#[test]
fn test_help_warns_about_paced_draws() {
    let dir = tempfile::tempdir().unwrap();
    arena_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--headless or --frame-ms 0"));
}

#[test]
fn test_reports_draw() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--headless", "--max-steps", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("draw after 21 steps"));
}

#[test]
fn test_json_report_with_verified_replays() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = program_bytes("one");
    let bot1 = write_bot(dir.path(), "one.wasm", &bytes);
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    let output = arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--frame-ms", "0", "--decide-at", "5", "--replays", "3", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"]["phase"], "won");
    assert_eq!(report["outcome"]["winner"], 1);
    assert_eq!(report["outcome"]["step"], 4);
    assert_eq!(report["replays_verified"], 3);
    assert_eq!(report["bot1"], ProgramBuffer::from(bytes).digest());
}

#[test]
fn test_auto_encoding_decodes_hex_bots() {
    let dir = tempfile::tempdir().unwrap();
    let module = program_bytes("hexed");
    let text = format!("0x{}", hex::encode(&module));
    let bot1 = write_bot(dir.path(), "one.hex", text.as_bytes());
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    let output = arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--headless", "--max-steps", "2", "--encoding", "auto", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["bot1"], ProgramBuffer::from(module).digest());
}

#[test]
fn test_config_file_sets_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[battle]\nmax_steps = 7\n").unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .arg("--headless")
        .assert()
        .success()
        .stdout(predicate::str::contains("draw after 8 steps"));
}

#[test]
fn test_first_run_writes_config_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--headless", "--max-steps", "1"])
        .assert()
        .success();

    assert!(dir.path().join("config.toml").exists());
    assert!(dir.path().join("logs").join("arena.log").exists());
}

#[test]
fn test_missing_bot_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(dir.path().join("nope.wasm"))
        .arg("--headless")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load bot programs"));
}

#[test]
fn test_zero_winner_code_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    arena_cmd(dir.path())
        .arg(&bot1)
        .arg(&bot2)
        .args(["--decide-at", "3", "--winner", "0"])
        .assert()
        .failure();
}

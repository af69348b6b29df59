//! Shared test utilities for kindred-cli integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Get a Command for the kindred binary.
///
/// The command never reads the developer's real config or API key.
#[allow(deprecated)]
pub fn kindred_cmd() -> Command {
    let mut cmd = Command::cargo_bin("kindred").expect("kindred binary should exist");
    cmd.env_remove("KINDRED_CONFIG")
        .env_remove("KINDRED_BACKEND_URL")
        .env_remove("OPENAI_API_KEY")
        .env("NO_COLOR", "1");
    cmd
}

/// Write a config that keeps everything inside `dir` and offline.
pub fn offline_config(dir: &Path) -> PathBuf {
    let store = dir.join("works.jsonl");
    let config = dir.join("config.yaml");
    fs::write(
        &config,
        format!(
            "store:\n  path: {}\nbackend:\n  kind: disabled\n",
            store.display()
        ),
    )
    .expect("write config");
    config
}

/// Write a JSONL file of works into `dir`.
pub fn works_file(dir: &Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("import.jsonl");
    fs::write(&path, lines.join("\n")).expect("write works file");
    path
}

//! Embeds the short commit hash shown by `kindred --version`.

use std::process::Command;

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

fn main() {
    // Release builds from a source tarball get the hash from CI.
    let hash = commit_hash()
        .or_else(|| {
            std::env::var("GIT_HASH")
                .ok()
                .filter(|h| !h.is_empty() && h != "unknown")
        })
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_HASH={}", hash);

    for watched in ["../../.git/HEAD", "../../.git/refs/heads"] {
        println!("cargo:rerun-if-changed={}", watched);
    }
    println!("cargo:rerun-if-env-changed=GIT_HASH");
}

//! Build identification for activos-conteo
//!
//! Exposes GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE to the binary, which
//! logs them at startup.

use std::process::Command;

/// Short commit hash, or "unknown" outside a git checkout
fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("GIT_HASH", git_hash()),
        ("BUILD_TIMESTAMP", timestamp),
        ("BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}

use std::env;
use std::process::Command;

/// Exposes the short commit hash to the crate as `GAFS_GIT_SHA` so reports can
/// stamp the exact build they were produced with.
fn main() {
    println!("cargo:rerun-if-env-changed=GAFS_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let sha = env::var("GAFS_GIT_SHA")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(git_short_sha);

    if let Some(sha) = sha {
        println!("cargo:rustc-env=GAFS_GIT_SHA={}", sha);
    }
}

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() { None } else { Some(sha) }
}

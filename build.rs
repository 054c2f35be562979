// Embeds build metadata shown by `cfdtunnel --version`.
//
// CFDTUNNEL_GIT_COMMIT: short commit hash, or "unknown" outside a git checkout.
// CFDTUNNEL_BUILD_TARGET: the target triple this binary was compiled for.
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=CFDTUNNEL_GIT_COMMIT");

    let commit = std::env::var("CFDTUNNEL_GIT_COMMIT")
        .ok()
        .filter(|c| !c.is_empty())
        .or_else(git_commit)
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=CFDTUNNEL_GIT_COMMIT={commit}");

    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=CFDTUNNEL_BUILD_TARGET={target}");
}

fn git_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let commit = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!commit.is_empty()).then_some(commit)
}

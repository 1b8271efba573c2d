//! Embeds human-readable build information for `prradar --version`.
//!
//! The string is `{crate version} ({git version}) {rustc version}`, with
//! missing parts left out. The git version is `git describe --tags --always
//! --dirty` when a tag is reachable, otherwise a pseudo-version of the form
//! `v{crate version}-{YYYYmmddHHMMSS}-{short sha}[+dirty]` whose timestamp
//! is the commit time for clean trees and the build time for dirty ones.

use std::process::Command;

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

/// `None` outside a git checkout. `.cargo-ok` is written by
/// `cargo install --git` and does not count as a change.
fn worktree_dirty() -> Option<bool> {
    let status = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let status = String::from_utf8(status.stdout).ok()?;
    Some(
        status
            .lines()
            .filter_map(|line| line.get(3..))
            .any(|path| path != ".cargo-ok"),
    )
}

fn pseudo_version() -> String {
    let sha = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let dirty = worktree_dirty();

    let timestamp = match dirty {
        Some(false) => git(&["log", "-1", "--format=%ct"])
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
    .unwrap_or_else(Utc::now)
    .format(TIMESTAMP_FORMAT);

    let suffix = if dirty == Some(true) { "+dirty" } else { "" };
    format!("v{}-{timestamp}-{sha}{suffix}", env!("CARGO_PKG_VERSION"))
}

fn git_version() -> String {
    match git(&["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn build_info() -> String {
    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        Some(format!("({})", git_version())),
        run("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

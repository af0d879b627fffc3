//! Stamps the git revision and target triple into the binary so a survey
//! report can be traced back to the build that wrote it.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_dirty = git(&["status", "--porcelain"]).map(|s| !s.is_empty()).unwrap_or(false);
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".into());

    println!("cargo:rustc-env=SURVEY_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=SURVEY_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=SURVEY_TARGET={}", target);
}

/// Trimmed stdout of a successful git command
fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}

//! Version stamp for `avatar-survey version` and exported reports.
//!
//! The git revision and target triple come from `build.rs`.

use std::fmt;

/// Identifies the binary that produced a report
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Short commit hash, or "unknown" outside a git checkout
    pub git_hash: &'static str,
    pub git_dirty: bool,
    pub target: &'static str,
}

/// Stamp of the running binary
pub fn build_info() -> BuildInfo {
    BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("SURVEY_GIT_HASH"),
        git_dirty: env!("SURVEY_GIT_DIRTY") == "true",
        target: env!("SURVEY_TARGET"),
    }
}

impl BuildInfo {
    /// Version recorded in exported reports, e.g. "0.1.0-abc1234"
    pub fn full_version(&self) -> String {
        let dirty = if self.git_dirty { "-dirty" } else { "" };
        format!("{}-{}{}", self.version, self.git_hash, dirty)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.version)?;
        writeln!(f, "  Git Hash: {}{}", self.git_hash, if self.git_dirty { " (dirty)" } else { "" })?;
        writeln!(f, "  Target:   {}", self.target)
    }
}

pub fn print_version() {
    print!("{}", build_info());
}

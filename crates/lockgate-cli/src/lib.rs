//! # lockgate-cli: CI Gate for Lockfile Provenance
//!
//! Provides the `lockgate` command-line interface. It reads its inputs from
//! flags, from the `INPUT_*` environment variables a GitHub Actions step
//! exports, and from an optional YAML config file, then runs the
//! [`lockgate_core`] orchestrator and reports the verdict.
//!
//! ```bash
//! lockgate                                   # <workspace>/package-lock.json, npm registry only
//! lockgate --lockfile-path yarn.lock --allowed-host yarn
//! lockgate --scheme git+ssh --allowed-host npm,github.com
//! lockgate --format json --config .lockgate.yaml
//! ```
//!
//! Exit status: 0 when every validator passes, 1 when violations were found,
//! 2 when the run could not complete (missing lockfile, bad configuration).

pub mod check;
pub mod config;
pub mod report;

use std::path::{Path, PathBuf};

/// Lockfile checked when no path is configured, relative to the workspace.
pub const DEFAULT_LOCKFILE: &str = "package-lock.json";

/// Anchor `path` at `workspace` unless it is already absolute.
///
/// The current directory is never consulted, so a missing file is reported
/// under the workspace path the caller configured.
pub fn resolve_path(path: &Path, workspace: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("yarn.lock");
        assert_eq!(resolve_path(&abs, Path::new("/somewhere")), abs);
    }

    #[test]
    fn relative_paths_join_the_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(
            resolve_path(Path::new("package-lock.json"), dir.path()),
            dir.path().join("package-lock.json")
        );
    }

    #[test]
    fn missing_relative_path_stays_under_workspace() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_path(Path::new("nope/yarn.lock"), dir.path()),
            dir.path().join("nope/yarn.lock")
        );
    }
}

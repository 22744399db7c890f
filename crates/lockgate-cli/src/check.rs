//! # Check Command
//!
//! Resolves inputs, runs the orchestrator against the configured lockfile,
//! and reports the outcome in the requested format.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use lockgate_core::{LockfileLoader, Orchestrator};

use crate::config::{load_file_config, resolve_inputs, FileConfig};
use crate::report::{reporter_for, OutputFormat};

/// Inputs for a lockfile check.
///
/// Every input can also be supplied through the environment variable a
/// GitHub Actions step exports for an input of the same name.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Lockfile to validate, relative to the workspace
    /// [default: package-lock.json].
    #[arg(long, env = "INPUT_LOCKFILEPATH", value_name = "PATH")]
    pub lockfile_path: Option<String>,

    /// Lockfile type (npm or yarn). Inferred from the file name when omitted.
    #[arg(long = "type", env = "INPUT_TYPE", value_name = "TYPE")]
    pub kind: Option<String>,

    /// Trusted registry host or alias (npm, yarn, verdaccio). Repeatable or
    /// comma-separated [default: npm].
    #[arg(long = "allowed-host", env = "INPUT_ALLOWEDHOSTS", value_name = "HOST")]
    pub allowed_hosts: Vec<String>,

    /// Additional URL scheme to allow besides https and http. Repeatable or
    /// comma-separated.
    #[arg(long = "scheme", env = "INPUT_SCHEMES", value_name = "SCHEME")]
    pub schemes: Vec<String>,

    /// Exact resolved URL exempt from the host check. Repeatable or
    /// comma-separated.
    #[arg(long = "allowed-url", env = "INPUT_ALLOWEDURLS", value_name = "URL")]
    pub allowed_urls: Vec<String>,

    /// Directory relative lockfile paths are resolved against
    /// [default: current directory].
    #[arg(long, env = "GITHUB_WORKSPACE", value_name = "DIR")]
    pub workspace: Option<String>,

    /// Output format. Defaults to `github` inside GitHub Actions, `text`
    /// elsewhere.
    #[arg(long, value_enum, env = "LOCKGATE_FORMAT")]
    pub format: Option<OutputFormat>,
}

/// Execute a check.
///
/// Returns exit code: 0 on pass, 1 on violations, 2 when the lockfile could
/// not be loaded or validation could not complete. Configuration problems are
/// returned as `Err`.
pub fn run_check(args: &CheckArgs, config: Option<&Path>) -> Result<u8> {
    let workspace = resolve_workspace(args)?;
    tracing::debug!(workspace = %workspace.display(), "resolved workspace");

    let file = match config {
        Some(path) => {
            let path = crate::resolve_path(path, &workspace);
            load_file_config(&path)?
        }
        None => FileConfig::default(),
    };

    let inputs = resolve_inputs(args, file, &workspace)?;
    let loader = match inputs.kind {
        Some(kind) => LockfileLoader::with_kind(kind),
        None => LockfileLoader::new(),
    };

    let format = args.format.unwrap_or_else(OutputFormat::detect);
    let stdout = std::io::stdout();
    let mut reporter = reporter_for(format, stdout.lock());

    let outcome =
        Orchestrator::new(loader).execute(&inputs.policy, &inputs.lockfile_path, reporter.as_mut());
    Ok(outcome.exit_code())
}

fn resolve_workspace(args: &CheckArgs) -> Result<PathBuf> {
    match args.workspace.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_workspace_is_used() {
        let args = CheckArgs {
            workspace: Some("/srv/repo".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_workspace(&args).unwrap(), PathBuf::from("/srv/repo"));
    }

    #[test]
    fn blank_workspace_falls_back_to_cwd() {
        let args = CheckArgs {
            workspace: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_workspace(&args).unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = CheckArgs {
            workspace: Some(dir.path().display().to_string()),
            format: Some(OutputFormat::Json),
            ..Default::default()
        };
        let err = run_check(&args, Some(Path::new("missing.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("missing.yaml"));
    }

    #[test]
    fn run_check_returns_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("package-lock.json");
        std::fs::write(
            &lock,
            r#"{"lockfileVersion": 3, "packages": {"node_modules/foo": {"resolved": "https://registry.npmjs.org/foo/-/foo-1.0.0.tgz"}}}"#,
        )
        .unwrap();
        let mut args = CheckArgs {
            workspace: Some(dir.path().display().to_string()),
            format: Some(OutputFormat::Json),
            ..Default::default()
        };
        assert_eq!(run_check(&args, None).unwrap(), 0);

        args.allowed_hosts = vec!["yarn".to_string()];
        assert_eq!(run_check(&args, None).unwrap(), 1);

        args.lockfile_path = Some("nope/package-lock.json".to_string());
        assert_eq!(run_check(&args, None).unwrap(), 2);
    }
}

//! # Input Resolution
//!
//! Merges the three configuration layers into one [`ResolvedInputs`]:
//!
//! 1. Flags and `INPUT_*` environment variables ([`CheckArgs`]).
//! 2. The optional YAML config file ([`FileConfig`]).
//! 3. Built-in defaults: `<workspace>/package-lock.json`, the npm registry,
//!    and the `https`/`http` baseline schemes.
//!
//! The first layer that sets a field wins. List inputs may arrive as one
//! comma- or newline-separated string (the only shape an action input can
//! take) or as repeated flags; [`split_list`] turns either into a sequence
//! once, here, and nothing downstream sees the scalar form.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use lockgate_core::{LockfileKind, PolicyConfig};

use crate::check::CheckArgs;

/// Contents of a `lockgate` YAML config file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Lockfile to check, relative to the workspace.
    #[serde(default)]
    pub lockfile_path: Option<PathBuf>,
    /// Trusted hosts or registry aliases.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
    /// Schemes allowed in addition to `https`/`http`.
    #[serde(default)]
    pub schemes: Vec<String>,
    /// Exact URLs exempt from the host check.
    #[serde(default)]
    pub allowed_urls: Vec<String>,
    /// `npm` or `yarn`; inferred from the file name when absent.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Load a YAML config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Fully resolved inputs for one run.
#[derive(Debug)]
pub struct ResolvedInputs {
    /// Lockfile to load.
    pub lockfile_path: PathBuf,
    /// Lockfile kind, when configured explicitly.
    pub kind: Option<LockfileKind>,
    /// Validation policy.
    pub policy: PolicyConfig,
}

/// Split list inputs on commas and newlines, trimming and dropping blanks.
pub fn split_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| {
            v.as_ref()
                .split([',', '\n'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Merge flags, file config and defaults.
pub fn resolve_inputs(args: &CheckArgs, file: FileConfig, workspace: &Path) -> Result<ResolvedInputs> {
    let lockfile_path = non_empty(args.lockfile_path.as_deref())
        .map(PathBuf::from)
        .or(file.lockfile_path)
        .unwrap_or_else(|| PathBuf::from(crate::DEFAULT_LOCKFILE));
    let lockfile_path = crate::resolve_path(&lockfile_path, workspace);

    let kind = non_empty(args.kind.as_deref())
        .map(str::to_string)
        .or(file.kind)
        .map(|k| k.parse::<LockfileKind>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let mut builder = PolicyConfig::builder();

    let hosts = split_list(&args.allowed_hosts);
    if !hosts.is_empty() {
        builder = builder.allowed_hosts(hosts);
    } else if let Some(hosts) = file.allowed_hosts {
        builder = builder.allowed_hosts(split_list(&hosts));
    }

    let schemes = split_list(&args.schemes);
    builder = if schemes.is_empty() {
        builder.extra_schemes(split_list(&file.schemes))
    } else {
        builder.extra_schemes(schemes)
    };

    let urls = split_list(&args.allowed_urls);
    builder = if urls.is_empty() {
        builder.allowed_urls(split_list(&file.allowed_urls))
    } else {
        builder.allowed_urls(urls)
    };

    let policy = builder.build().context("invalid validation policy")?;

    tracing::debug!(
        lockfile = %lockfile_path.display(),
        kind = ?kind,
        hosts = ?policy.allowed_hosts(),
        schemes = ?policy.allowed_schemes(),
        "resolved inputs"
    );

    Ok(ResolvedInputs {
        lockfile_path,
        kind,
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CheckArgs {
        CheckArgs::default()
    }

    #[test]
    fn split_list_coerces_scalar_inputs() {
        assert_eq!(split_list(&["git+ssh"]), vec!["git+ssh"]);
        assert_eq!(
            split_list(&["git+ssh, git+https\nssh", ""]),
            vec!["git+ssh", "git+https", "ssh"]
        );
        assert_eq!(split_list(&["a", "b,c"]), vec!["a", "b", "c"]);
        assert!(split_list(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn defaults_apply_without_inputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        let inputs = resolve_inputs(&args(), FileConfig::default(), dir.path()).unwrap();
        assert_eq!(inputs.lockfile_path, dir.path().join("package-lock.json"));
        assert_eq!(inputs.policy, PolicyConfig::default());
        assert!(inputs.kind.is_none());
    }

    #[test]
    fn empty_action_inputs_fall_back() {
        let mut a = args();
        a.lockfile_path = Some(String::new());
        a.schemes = vec![String::new()];
        a.kind = Some("  ".to_string());
        let inputs = resolve_inputs(&a, FileConfig::default(), Path::new("/w")).unwrap();
        assert!(inputs.lockfile_path.ends_with("package-lock.json"));
        assert_eq!(inputs.policy, PolicyConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let mut a = args();
        a.allowed_hosts = vec!["yarn".to_string()];
        a.lockfile_path = Some("/abs/yarn.lock".to_string());
        let file = FileConfig {
            lockfile_path: Some(PathBuf::from("other.json")),
            allowed_hosts: Some(vec!["npm".to_string()]),
            schemes: vec!["git+ssh".to_string()],
            ..Default::default()
        };
        let inputs = resolve_inputs(&a, file, Path::new("/w")).unwrap();
        assert_eq!(inputs.lockfile_path, PathBuf::from("/abs/yarn.lock"));
        assert!(inputs.policy.allowed_hosts().contains("registry.yarnpkg.com"));
        assert!(!inputs.policy.allowed_hosts().contains("registry.npmjs.org"));
        // Schemes came from the file because no flag set them.
        assert!(inputs.policy.allowed_schemes().contains("git+ssh"));
    }

    #[test]
    fn explicit_kind_is_parsed() {
        let mut a = args();
        a.kind = Some("yarn".to_string());
        let inputs = resolve_inputs(&a, FileConfig::default(), Path::new("/w")).unwrap();
        assert_eq!(inputs.kind, Some(LockfileKind::Yarn));

        a.kind = Some("pnpm".to_string());
        assert!(resolve_inputs(&a, FileConfig::default(), Path::new("/w")).is_err());
    }

    #[test]
    fn empty_host_list_in_file_is_an_error() {
        let file = FileConfig {
            allowed_hosts: Some(vec![]),
            ..Default::default()
        };
        let err = resolve_inputs(&args(), file, Path::new("/w")).unwrap_err();
        assert!(format!("{err:#}").contains("at least one host"));
    }

    #[test]
    fn load_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockgate.yaml");
        std::fs::write(
            &path,
            "lockfile_path: web/package-lock.json\nallowed_hosts: [npm, github.com]\nschemes:\n  - git+ssh\ntype: npm\n",
        )
        .unwrap();
        let config = load_file_config(&path).unwrap();
        assert_eq!(config.lockfile_path, Some(PathBuf::from("web/package-lock.json")));
        assert_eq!(
            config.allowed_hosts,
            Some(vec!["npm".to_string(), "github.com".to_string()])
        );
        assert_eq!(config.schemes, vec!["git+ssh"]);
        assert_eq!(config.kind.as_deref(), Some("npm"));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockgate.yaml");
        std::fs::write(&path, "allowed_host: [npm]\n").unwrap();
        assert!(load_file_config(&path).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_file_config(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(format!("{err}").contains("failed to read config file"));
    }
}

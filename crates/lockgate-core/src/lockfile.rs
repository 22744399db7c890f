//! # Lockfile Loader
//!
//! Turns a lockfile on disk into a [`PackageModel`].
//!
//! Two lockfile families are read:
//!
//! - **npm** (`package-lock.json`, `npm-shrinkwrap.json`): the `packages` map
//!   of lockfileVersion 2/3, falling back to the nested `dependencies` tree of
//!   lockfileVersion 1.
//! - **yarn classic** (`yarn.lock` v1): block headers followed by indented
//!   `resolved "<url>"` fields.
//!
//! Entries that never come from a network source are dropped here rather than
//! in the validators: the root project entry, workspace links, and bundled
//! dependencies that ship inside their parent's tarball.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::package::{PackageEntry, PackageMetadata, PackageModel};

/// Lockfile families the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockfileKind {
    /// `package-lock.json` / `npm-shrinkwrap.json`.
    Npm,
    /// Yarn classic `yarn.lock`.
    Yarn,
}

impl LockfileKind {
    /// Infer the kind from the file name, if it is a well-known lockfile name.
    pub fn infer(path: &Path) -> Option<Self> {
        match path.file_name().and_then(|f| f.to_str()) {
            Some("package-lock.json") | Some("npm-shrinkwrap.json") => Some(Self::Npm),
            Some("yarn.lock") => Some(Self::Yarn),
            _ => None,
        }
    }

    /// Lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }
}

impl fmt::Display for LockfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            other => Err(format!("unknown lockfile type \"{other}\" (expected npm or yarn)")),
        }
    }
}

/// Anything that can produce a [`PackageModel`] from a path.
///
/// The orchestrator depends on this trait rather than on [`LockfileLoader`]
/// so the loading stage can be replaced in tests.
pub trait LockfileSource {
    /// Load and normalize the lockfile at `path`.
    fn load(&self, path: &Path) -> Result<PackageModel, ParseError>;
}

/// Filesystem-backed lockfile loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockfileLoader {
    kind: Option<LockfileKind>,
}

impl LockfileLoader {
    /// Loader that infers the lockfile kind from the file name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that always parses as `kind`, whatever the file is called.
    pub fn with_kind(kind: LockfileKind) -> Self {
        Self { kind: Some(kind) }
    }
}

impl LockfileSource for LockfileLoader {
    fn load(&self, path: &Path) -> Result<PackageModel, ParseError> {
        let kind = match self.kind.or_else(|| LockfileKind::infer(path)) {
            Some(kind) => kind,
            None => {
                return Err(ParseError::UnknownKind {
                    path: path.to_path_buf(),
                })
            }
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParseError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ParseError::Unreadable {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if content.trim().is_empty() {
            return Err(ParseError::Empty {
                path: path.to_path_buf(),
            });
        }

        let model = match kind {
            LockfileKind::Npm => parse_npm(path, &content)?,
            LockfileKind::Yarn => parse_yarn(path, &content)?,
        };

        tracing::debug!(
            path = %path.display(),
            kind = %kind,
            packages = model.len(),
            "loaded lockfile"
        );
        Ok(model)
    }
}

/// Load a lockfile, inferring its kind from the file name.
pub fn load(path: &Path) -> Result<PackageModel, ParseError> {
    LockfileLoader::new().load(path)
}

// ---------------------------------------------------------------------------
// npm
// ---------------------------------------------------------------------------

/// Parse the contents of an npm lockfile.
pub fn parse_npm(path: &Path, content: &str) -> Result<PackageModel, ParseError> {
    let malformed = |detail: String| ParseError::Malformed {
        path: path.to_path_buf(),
        detail,
    };

    let root: Value = serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;
    let root = root
        .as_object()
        .ok_or_else(|| malformed("top-level value must be a JSON object".to_string()))?;

    let version = root
        .get("lockfileVersion")
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed("missing numeric lockfileVersion".to_string()))?;

    let mut entries = Vec::new();
    if let Some(packages) = root.get("packages") {
        let packages = packages
            .as_object()
            .ok_or_else(|| malformed("\"packages\" must be an object".to_string()))?;
        collect_npm_packages(packages, &mut entries).map_err(malformed)?;
    } else if let Some(dependencies) = root.get("dependencies") {
        let dependencies = dependencies
            .as_object()
            .ok_or_else(|| malformed("\"dependencies\" must be an object".to_string()))?;
        collect_npm_dependencies(dependencies, "", &mut entries).map_err(malformed)?;
    }

    tracing::trace!(lockfile_version = version, entries = entries.len(), "parsed npm lockfile");
    Ok(PackageModel::new(entries))
}

/// lockfileVersion 2/3: flat map keyed by install location.
fn collect_npm_packages(
    packages: &Map<String, Value>,
    entries: &mut Vec<PackageEntry>,
) -> Result<(), String> {
    for (location, meta) in packages {
        let Some((_, name)) = location.rsplit_once("node_modules/") else {
            // Root project ("") and workspace source folders.
            continue;
        };
        let meta = meta
            .as_object()
            .ok_or_else(|| format!("package entry \"{location}\" must be an object"))?;
        if is_true(meta, "link") || is_true(meta, "inBundle") || is_true(meta, "bundled") {
            tracing::trace!(location = %location, "skipping non-network package entry");
            continue;
        }
        entries.push(npm_entry(name, location, meta));
    }
    Ok(())
}

/// lockfileVersion 1: nested `dependencies` tree.
fn collect_npm_dependencies(
    dependencies: &Map<String, Value>,
    parent: &str,
    entries: &mut Vec<PackageEntry>,
) -> Result<(), String> {
    for (name, meta) in dependencies {
        let locator = if parent.is_empty() {
            name.clone()
        } else {
            format!("{parent} > {name}")
        };
        let meta = meta
            .as_object()
            .ok_or_else(|| format!("dependency entry \"{locator}\" must be an object"))?;
        if !is_true(meta, "bundled") {
            entries.push(npm_entry(name, &locator, meta));
        }
        if let Some(nested) = meta.get("dependencies") {
            let nested = nested
                .as_object()
                .ok_or_else(|| format!("\"dependencies\" of \"{locator}\" must be an object"))?;
            collect_npm_dependencies(nested, &locator, entries)?;
        }
    }
    Ok(())
}

fn npm_entry(name: &str, locator: &str, meta: &Map<String, Value>) -> PackageEntry {
    let field = |key: &str| meta.get(key).and_then(Value::as_str).map(str::to_string);
    PackageEntry::new(name, field("resolved")).with_metadata(PackageMetadata {
        version: field("version"),
        integrity: field("integrity"),
        locator: Some(locator.to_string()),
    })
}

fn is_true(meta: &Map<String, Value>, key: &str) -> bool {
    meta.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// yarn classic
// ---------------------------------------------------------------------------

/// Parse the contents of a yarn classic (v1) lockfile.
pub fn parse_yarn(path: &Path, content: &str) -> Result<PackageModel, ParseError> {
    let malformed = |line_no: usize, detail: &str| ParseError::Malformed {
        path: path.to_path_buf(),
        detail: format!("line {line_no}: {detail}"),
    };

    let mut entries: Vec<PackageEntry> = Vec::new();
    let mut current: Option<PackageEntry> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = raw.len() - raw.trim_start().len();
        if indent == 0 {
            if trimmed == "__metadata:" {
                return Err(ParseError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    detail: "yarn berry lockfiles are not supported; only yarn classic (v1)"
                        .to_string(),
                });
            }
            let header = trimmed
                .strip_suffix(':')
                .ok_or_else(|| malformed(line_no, "expected a package header ending in ':'"))?;
            entries.extend(current.take());
            current = Some(yarn_header_entry(header));
            continue;
        }

        let entry = current
            .as_mut()
            .ok_or_else(|| malformed(line_no, "field appears before any package header"))?;
        if indent != 2 {
            // Nested maps such as `dependencies:` bodies.
            continue;
        }
        let Some((key, value)) = trimmed.split_once(char::is_whitespace) else {
            // Section openers such as `dependencies:`.
            continue;
        };
        let value = unquote(value.trim());
        match key {
            "resolved" => entry.resolved = Some(value.to_string()),
            "version" => entry.metadata.version = Some(value.to_string()),
            "integrity" => entry.metadata.integrity = Some(value.to_string()),
            _ => {}
        }
    }
    entries.extend(current);

    tracing::trace!(entries = entries.len(), "parsed yarn lockfile");
    Ok(PackageModel::new(entries))
}

fn yarn_header_entry(header: &str) -> PackageEntry {
    let first = header.split(',').next().unwrap_or(header);
    let descriptor = unquote(first.trim());
    PackageEntry::new(yarn_package_name(descriptor), None).with_metadata(PackageMetadata {
        locator: Some(header.to_string()),
        ..Default::default()
    })
}

/// `@scope/name@^1.0.0` → `@scope/name`, `name@npm:other@^2` → `name`.
fn yarn_package_name(descriptor: &str) -> &str {
    match descriptor.get(1..).and_then(|rest| rest.find('@')) {
        Some(at) => &descriptor[..at + 1],
        None => descriptor,
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

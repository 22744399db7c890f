//! # Error Hierarchy
//!
//! Structured error types for lockgate, built with `thiserror`.
//!
//! Policy violations are not errors: they are data carried by
//! [`ValidationResult::Failure`](crate::validate::ValidationResult). The types
//! here cover the genuinely exceptional paths only: a lockfile that cannot be
//! loaded, a policy that cannot be constructed, and unexpected failures inside
//! a validator.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Top-level error type for lockgate.
#[derive(Error, Debug)]
pub enum LockgateError {
    /// The lockfile could not be turned into a package model.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// The policy configuration is unusable.
    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    /// Unexpected failure while a validator was running.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading a lockfile.
///
/// Every variant names the path that was attempted so the message is
/// actionable on its own.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No file exists at the configured path.
    #[error("lockfile not found: {path}")]
    NotFound {
        /// The attempted path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read lockfile {path}: {source}")]
    Unreadable {
        /// The attempted path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The file is empty or whitespace only.
    #[error("lockfile is empty: {path}")]
    Empty {
        /// The attempted path.
        path: PathBuf,
    },

    /// The file is not valid lockfile syntax.
    #[error("failed to parse lockfile {path}: {detail}")]
    Malformed {
        /// The attempted path.
        path: PathBuf,
        /// What the parser rejected.
        detail: String,
    },

    /// The file is a lockfile flavour this loader does not read.
    #[error("unsupported lockfile format at {path}: {detail}")]
    UnsupportedFormat {
        /// The attempted path.
        path: PathBuf,
        /// Which flavour was detected.
        detail: String,
    },

    /// The lockfile kind could not be inferred from the file name.
    #[error("unable to infer lockfile type from {path} (expected package-lock.json, npm-shrinkwrap.json or yarn.lock)")]
    UnknownKind {
        /// The attempted path.
        path: PathBuf,
    },
}

impl ParseError {
    /// The path the loader attempted.
    pub fn path(&self) -> &Path {
        match self {
            ParseError::NotFound { path }
            | ParseError::Unreadable { path, .. }
            | ParseError::Empty { path }
            | ParseError::Malformed { path, .. }
            | ParseError::UnsupportedFormat { path, .. }
            | ParseError::UnknownKind { path } => path,
        }
    }
}

/// Errors raised while constructing a [`PolicyConfig`](crate::policy::PolicyConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The host allow-list must contain at least one host.
    #[error("host allow-list must contain at least one host")]
    EmptyHostAllowList,

    /// A scheme entry was empty after normalization.
    #[error("scheme entries must be non-empty")]
    EmptyScheme,

    /// A host entry is empty or contains URL syntax.
    #[error("invalid host entry: \"{host}\" (expected a bare host name such as registry.npmjs.org)")]
    InvalidHost {
        /// The rejected entry after alias resolution.
        host: String,
    },
}

/// Result type alias for lockgate operations.
pub type LockgateResult<T> = Result<T, LockgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_path() {
        let err = ParseError::NotFound {
            path: PathBuf::from("/work/package-lock.json"),
        };
        assert!(format!("{err}").contains("/work/package-lock.json"));
    }

    #[test]
    fn malformed_carries_detail() {
        let err = ParseError::Malformed {
            path: PathBuf::from("yarn.lock"),
            detail: "line 3: expected resolved value".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("yarn.lock"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn parse_error_path_accessor() {
        let err = ParseError::Empty {
            path: PathBuf::from("a/package-lock.json"),
        };
        assert_eq!(err.path(), Path::new("a/package-lock.json"));
    }

    #[test]
    fn lockgate_error_wraps_parse_transparently() {
        let err = LockgateError::from(ParseError::UnknownKind {
            path: PathBuf::from("deps.txt"),
        });
        let msg = format!("{err}");
        assert!(msg.starts_with("unable to infer lockfile type"));
        assert!(msg.contains("deps.txt"));
    }

    #[test]
    fn policy_error_display() {
        let err = LockgateError::from(PolicyError::EmptyHostAllowList);
        assert!(format!("{err}").contains("at least one host"));

        let err = PolicyError::InvalidHost {
            host: "https://x".to_string(),
        };
        assert!(format!("{err}").contains("https://x"));
    }
}

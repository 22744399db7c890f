//! # Validators
//!
//! Each validator checks every [`PackageEntry`] of a [`PackageModel`] against
//! one policy axis:
//!
//! - [`HostValidator`]: the resolved URL's host is a trusted registry.
//! - [`SchemeValidator`]: the resolved URL's scheme is on the allow-list.
//! - [`TransportSecurityValidator`]: the resolved URL uses an encrypted
//!   transport (loopback hosts excepted).
//!
//! Violations are data, not errors. A validator walks the whole model and
//! returns every violation it finds, in model order, so that one run shows the
//! user everything that needs fixing. An entry whose `resolved` URL is missing
//! or unparseable violates every axis.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Serialize;
use url::{Host, Url};

use crate::error::{LockgateResult, PolicyError};
use crate::package::{PackageEntry, PackageModel};
use crate::policy::{normalize_scheme, PolicyConfig, BASELINE_SCHEMES};

/// Schemes treated as encrypted transport. `ssh` based git transports count as
/// encrypted; `git://`, `git+http://` and plain `http://` do not.
pub const ENCRYPTED_SCHEMES: [&str; 4] = ["https", "git+https", "ssh", "git+ssh"];

/// Placeholder shown when an entry has no `resolved` URL at all.
const MISSING_RESOLVED: &str = "<missing resolved URL>";

/// One policy failure tied to one lockfile entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Human-readable, single-line description naming the package.
    pub message: String,
    /// The package that violated the policy.
    pub package_name: String,
    /// The host, scheme or URL that was rejected.
    pub offending_value: String,
}

/// Outcome of one validator over one package model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "violations", rename_all = "snake_case")]
pub enum ValidationResult {
    /// No entry violated the policy.
    Success,
    /// At least one entry violated the policy. Never empty.
    Failure(Vec<Violation>),
}

impl ValidationResult {
    /// `Success` when `violations` is empty, otherwise `Failure`.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Success
        } else {
            Self::Failure(violations)
        }
    }

    /// Whether this is the `Success` variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The recorded violations; empty for `Success`.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Success => &[],
            Self::Failure(violations) => violations,
        }
    }
}

/// A single policy axis checked against a package model.
pub trait Validator {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check every entry of `packages`.
    ///
    /// Policy violations are reported through [`ValidationResult::Failure`].
    /// `Err` is reserved for failures of the validator itself.
    fn validate(&self, packages: &PackageModel) -> LockgateResult<ValidationResult>;
}

/// The entry's resolved URL, or the value to report when it cannot be parsed.
fn resolved_url(entry: &PackageEntry) -> Result<Url, String> {
    let raw = entry
        .resolved
        .as_deref()
        .ok_or_else(|| MISSING_RESOLVED.to_string())?;
    Url::parse(raw).map_err(|_| raw.to_string())
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Checks that every package resolves from a trusted host.
#[derive(Debug, Clone)]
pub struct HostValidator {
    allowed_hosts: BTreeSet<String>,
    allowed_urls: BTreeSet<String>,
}

impl HostValidator {
    /// Create a validator for `allowed_hosts`.
    ///
    /// Fails when the allow-list is empty: an empty list would reject every
    /// package and almost certainly means the configuration was lost.
    pub fn new(allowed_hosts: BTreeSet<String>) -> Result<Self, PolicyError> {
        if allowed_hosts.is_empty() {
            return Err(PolicyError::EmptyHostAllowList);
        }
        Ok(Self {
            allowed_hosts,
            allowed_urls: BTreeSet::new(),
        })
    }

    /// Exempt exact resolved URLs from the host check.
    pub fn with_allowed_urls(mut self, urls: BTreeSet<String>) -> Self {
        self.allowed_urls = urls;
        self
    }

    /// Build from a policy.
    pub fn from_policy(policy: &PolicyConfig) -> Result<Self, PolicyError> {
        let validator = Self::new(policy.allowed_hosts().clone())?;
        Ok(validator.with_allowed_urls(policy.allowed_urls().clone()))
    }

    fn host_allowed(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let with_port = url.port().map(|p| format!("{host}:{p}"));
        let allowed = self.allowed_hosts.contains(&host)
            || with_port
                .as_ref()
                .is_some_and(|hp| self.allowed_hosts.contains(hp));
        if allowed {
            None
        } else {
            Some(with_port.unwrap_or(host))
        }
    }

    fn violation(&self, entry: &PackageEntry, actual: String) -> Violation {
        Violation {
            message: format!(
                "detected invalid host for package: {} (expected one of: {}; actual: {})",
                entry.name,
                join(&self.allowed_hosts),
                actual
            ),
            package_name: entry.name.clone(),
            offending_value: actual,
        }
    }
}

impl Validator for HostValidator {
    fn name(&self) -> &'static str {
        "host"
    }

    fn validate(&self, packages: &PackageModel) -> LockgateResult<ValidationResult> {
        let mut violations = Vec::new();
        for entry in packages {
            if entry
                .resolved
                .as_ref()
                .is_some_and(|r| self.allowed_urls.contains(r))
            {
                continue;
            }
            match resolved_url(entry) {
                Ok(url) => match url.host_str() {
                    None => violations.push(self.violation(entry, url.to_string())),
                    Some(_) => {
                        if let Some(actual) = self.host_allowed(&url) {
                            violations.push(self.violation(entry, actual));
                        }
                    }
                },
                Err(actual) => violations.push(self.violation(entry, actual)),
            }
        }
        Ok(ValidationResult::from_violations(violations))
    }
}

// ---------------------------------------------------------------------------
// Scheme
// ---------------------------------------------------------------------------

/// Checks that every package resolves over an allowed URL scheme.
#[derive(Debug, Clone)]
pub struct SchemeValidator {
    allowed_schemes: BTreeSet<String>,
}

impl SchemeValidator {
    /// Create a validator permitting the baseline schemes plus `extra`.
    ///
    /// The baseline `https`/`http` cannot be removed here.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_schemes: BTreeSet<String> =
            BASELINE_SCHEMES.iter().map(|s| s.to_string()).collect();
        allowed_schemes.extend(
            extra
                .into_iter()
                .map(|s| normalize_scheme(s.as_ref()))
                .filter(|s| !s.is_empty()),
        );
        Self { allowed_schemes }
    }

    /// Build from a policy.
    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.allowed_schemes())
    }

    /// The effective allow-list.
    pub fn allowed_schemes(&self) -> &BTreeSet<String> {
        &self.allowed_schemes
    }
}

impl Validator for SchemeValidator {
    fn name(&self) -> &'static str {
        "scheme"
    }

    fn validate(&self, packages: &PackageModel) -> LockgateResult<ValidationResult> {
        let mut violations = Vec::new();
        for entry in packages {
            let actual = match resolved_url(entry) {
                Ok(url) if self.allowed_schemes.contains(url.scheme()) => continue,
                Ok(url) => url.scheme().to_string(),
                Err(actual) => actual,
            };
            violations.push(Violation {
                message: format!(
                    "detected invalid scheme for package: {} (expected one of: {}; actual: {})",
                    entry.name,
                    join(&self.allowed_schemes),
                    actual
                ),
                package_name: entry.name.clone(),
                offending_value: actual,
            });
        }
        Ok(ValidationResult::from_violations(violations))
    }
}

// ---------------------------------------------------------------------------
// Transport security
// ---------------------------------------------------------------------------

/// Checks that every non-loopback package resolves over encrypted transport.
///
/// This axis has no configuration: an operator may allow `http` in the
/// scheme allow-list and this validator still rejects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportSecurityValidator;

impl TransportSecurityValidator {
    /// Create the validator.
    pub fn new() -> Self {
        Self
    }
}

fn is_encrypted(scheme: &str) -> bool {
    ENCRYPTED_SCHEMES.contains(&scheme)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

impl Validator for TransportSecurityValidator {
    fn name(&self) -> &'static str {
        "transport"
    }

    fn validate(&self, packages: &PackageModel) -> LockgateResult<ValidationResult> {
        let mut violations = Vec::new();
        for entry in packages {
            let actual = match resolved_url(entry) {
                Ok(url) if is_encrypted(url.scheme()) || is_loopback(&url) => continue,
                Ok(url) => url.scheme().to_string(),
                Err(actual) => actual,
            };
            violations.push(Violation {
                message: format!(
                    "detected insecure transport for package: {} (expected an encrypted scheme; actual: {})",
                    entry.name, actual
                ),
                package_name: entry.name.clone(),
                offending_value: actual,
            });
        }
        Ok(ValidationResult::from_violations(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(entries: &[(&str, Option<&str>)]) -> PackageModel {
        entries
            .iter()
            .map(|(name, resolved)| PackageEntry::new(*name, resolved.map(str::to_string)))
            .collect()
    }

    fn npm_hosts() -> BTreeSet<String> {
        ["registry.npmjs.org".to_string()].into_iter().collect()
    }

    #[test]
    fn host_accepts_registry() {
        let packages = model(&[("foo", Some("https://registry.npmjs.org/foo/-/foo-1.0.0.tgz"))]);
        let result = HostValidator::new(npm_hosts()).unwrap().validate(&packages).unwrap();
        assert!(result.is_success());
    }

    #[test]
    fn host_rejects_foreign_host_in_model_order() {
        let packages = model(&[
            ("b", Some("https://evil.example.com/b.tgz")),
            ("ok", Some("https://registry.npmjs.org/ok/-/ok-1.0.0.tgz")),
            ("a", Some("https://other.example.org/a.tgz")),
        ]);
        let result = HostValidator::new(npm_hosts()).unwrap().validate(&packages).unwrap();
        let violations = result.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].package_name, "b");
        assert_eq!(violations[0].offending_value, "evil.example.com");
        assert!(violations[0].message.contains("package: b"));
        assert!(violations[0].message.contains("registry.npmjs.org"));
        assert_eq!(violations[1].package_name, "a");
    }

    #[test]
    fn host_flags_missing_and_malformed_urls() {
        let packages = model(&[("none", None), ("bad", Some("not a url"))]);
        let result = HostValidator::new(npm_hosts()).unwrap().validate(&packages).unwrap();
        let violations = result.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].offending_value, MISSING_RESOLVED);
        assert_eq!(violations[1].offending_value, "not a url");
    }

    #[test]
    fn host_without_host_component_is_flagged() {
        let packages = model(&[("local", Some("file:///tmp/local.tgz"))]);
        let result = HostValidator::new(npm_hosts()).unwrap().validate(&packages).unwrap();
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn host_matches_with_port() {
        let hosts = ["localhost:4873".to_string()].into_iter().collect();
        let packages = model(&[("foo", Some("http://localhost:4873/foo/-/foo-1.0.0.tgz"))]);
        let result = HostValidator::new(hosts).unwrap().validate(&packages).unwrap();
        assert!(result.is_success());

        let packages = model(&[("foo", Some("http://localhost:9999/foo.tgz"))]);
        let hosts = ["localhost:4873".to_string()].into_iter().collect();
        let result = HostValidator::new(hosts).unwrap().validate(&packages).unwrap();
        assert_eq!(result.violations()[0].offending_value, "localhost:9999");
    }

    #[test]
    fn host_allowed_url_bypasses_check() {
        let url = "https://cdn.example.com/pinned-1.0.0.tgz";
        let packages = model(&[("pinned", Some(url))]);
        let validator = HostValidator::new(npm_hosts())
            .unwrap()
            .with_allowed_urls([url.to_string()].into_iter().collect());
        assert!(validator.validate(&packages).unwrap().is_success());
    }

    #[test]
    fn host_empty_allow_list_fails_fast() {
        assert_eq!(
            HostValidator::new(BTreeSet::new()).unwrap_err(),
            PolicyError::EmptyHostAllowList
        );
    }

    #[test]
    fn scheme_baseline_accepts_http_and_https() {
        let packages = model(&[
            ("a", Some("https://registry.npmjs.org/a.tgz")),
            ("b", Some("http://registry.npmjs.org/b.tgz")),
        ]);
        let validator = SchemeValidator::new(Vec::<String>::new());
        assert!(validator.validate(&packages).unwrap().is_success());
    }

    #[test]
    fn scheme_rejects_unlisted_scheme() {
        let packages = model(&[("y", Some("git+ssh://github.com/x/y.git"))]);
        let result = SchemeValidator::new(Vec::<String>::new())
            .validate(&packages)
            .unwrap();
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].offending_value, "git+ssh");
        assert!(result.violations()[0].message.contains("package: y"));
    }

    #[test]
    fn scheme_extension_accepts_git_ssh() {
        let packages = model(&[("y", Some("git+ssh://github.com/x/y.git"))]);
        let result = SchemeValidator::new(["git+ssh:"]).validate(&packages).unwrap();
        assert!(result.is_success());
    }

    #[test]
    fn scheme_cannot_shrink_below_baseline() {
        let validator = SchemeValidator::new(["git+ssh"]);
        assert!(validator.allowed_schemes().contains("http"));
        assert!(validator.allowed_schemes().contains("https"));
    }

    #[test]
    fn scheme_flags_missing_url() {
        let packages = model(&[("none", None)]);
        let result = SchemeValidator::new(Vec::<String>::new())
            .validate(&packages)
            .unwrap();
        assert_eq!(result.violations()[0].offending_value, MISSING_RESOLVED);
    }

    #[test]
    fn transport_rejects_plain_http_and_git() {
        let packages = model(&[
            ("a", Some("http://registry.npmjs.org/a.tgz")),
            ("b", Some("git://github.com/x/b.git")),
            ("c", Some("git+http://github.com/x/c.git")),
            ("d", Some("https://registry.npmjs.org/d.tgz")),
        ]);
        let result = TransportSecurityValidator::new().validate(&packages).unwrap();
        let names: Vec<&str> = result
            .violations()
            .iter()
            .map(|v| v.package_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn transport_treats_ssh_as_encrypted() {
        let packages = model(&[
            ("y", Some("git+ssh://github.com/x/y.git")),
            ("z", Some("git+https://github.com/x/z.git")),
        ]);
        let result = TransportSecurityValidator::new().validate(&packages).unwrap();
        assert!(result.is_success());
    }

    #[test]
    fn transport_exempts_loopback() {
        let packages = model(&[
            ("a", Some("http://localhost:4873/a.tgz")),
            ("b", Some("http://127.0.0.1:4873/b.tgz")),
            ("c", Some("http://[::1]:4873/c.tgz")),
        ]);
        let result = TransportSecurityValidator::new().validate(&packages).unwrap();
        assert!(result.is_success());
    }

    #[test]
    fn transport_flags_missing_url() {
        let packages = model(&[("none", None)]);
        let result = TransportSecurityValidator::new().validate(&packages).unwrap();
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn empty_model_passes_every_validator() {
        let packages = PackageModel::default();
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(HostValidator::new(npm_hosts()).unwrap()),
            Box::new(TransportSecurityValidator::new()),
            Box::new(SchemeValidator::new(Vec::<String>::new())),
        ];
        for v in &validators {
            assert!(v.validate(&packages).unwrap().is_success(), "{}", v.name());
        }
    }

    #[test]
    fn from_violations_normalizes_empty() {
        assert_eq!(ValidationResult::from_violations(vec![]), ValidationResult::Success);
    }
}

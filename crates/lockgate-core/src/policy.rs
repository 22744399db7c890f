//! # Policy Configuration
//!
//! The parameters of one validation run: which registry hosts are trusted,
//! which URL schemes may appear, and which exact URLs are exempt from the host
//! check. A [`PolicyConfig`] is built once per invocation and never mutated.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::PolicyError;

/// Schemes every policy allows. Callers can add to this set but not remove
/// from it; restricting transport to encrypted schemes is the job of the
/// transport security validator.
pub const BASELINE_SCHEMES: [&str; 2] = ["https", "http"];

/// Host allow-list used when the caller supplies none.
pub const DEFAULT_HOSTS: [&str; 1] = ["npm"];

/// Well-known registry aliases accepted in place of a host name.
const HOST_ALIASES: [(&str, &str); 3] = [
    ("npm", "registry.npmjs.org"),
    ("yarn", "registry.yarnpkg.com"),
    ("verdaccio", "registry.verdaccio.org"),
];

/// Resolve a registry alias to its host name. Unknown names pass through
/// lowercased.
pub fn resolve_host_alias(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    HOST_ALIASES
        .iter()
        .find(|(alias, _)| *alias == host)
        .map(|(_, resolved)| resolved.to_string())
        .unwrap_or(host)
}

/// Normalize a scheme as written by users (`HTTPS:`, `git+ssh`) into the form
/// the `url` crate reports (`https`, `git+ssh`).
pub fn normalize_scheme(scheme: &str) -> String {
    scheme
        .trim()
        .trim_end_matches("//")
        .trim_end_matches(':')
        .to_ascii_lowercase()
}

/// Immutable policy for one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyConfig {
    allowed_hosts: BTreeSet<String>,
    allowed_schemes: BTreeSet<String>,
    allowed_urls: BTreeSet<String>,
}

impl PolicyConfig {
    /// Start building a policy from the defaults.
    pub fn builder() -> PolicyConfigBuilder {
        PolicyConfigBuilder::default()
    }

    /// Trusted registry hosts, aliases already resolved.
    pub fn allowed_hosts(&self) -> &BTreeSet<String> {
        &self.allowed_hosts
    }

    /// Permitted URL schemes, always a superset of [`BASELINE_SCHEMES`].
    pub fn allowed_schemes(&self) -> &BTreeSet<String> {
        &self.allowed_schemes
    }

    /// Exact resolved URLs that pass the host check regardless of host.
    pub fn allowed_urls(&self) -> &BTreeSet<String> {
        &self.allowed_urls
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: DEFAULT_HOSTS.iter().map(|h| resolve_host_alias(h)).collect(),
            allowed_schemes: BASELINE_SCHEMES.iter().map(|s| s.to_string()).collect(),
            allowed_urls: BTreeSet::new(),
        }
    }
}

/// Builder for [`PolicyConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PolicyConfigBuilder {
    hosts: Option<Vec<String>>,
    extra_schemes: Vec<String>,
    urls: Vec<String>,
}

impl PolicyConfigBuilder {
    /// Replace the default host allow-list.
    ///
    /// An empty list is rejected at [`build`](Self::build) time rather than
    /// falling back to the default.
    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Add schemes on top of the baseline `https`/`http`.
    pub fn extra_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_schemes
            .extend(schemes.into_iter().map(Into::into));
        self
    }

    /// Exempt exact URLs from the host check.
    pub fn allowed_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Validate and freeze the policy.
    pub fn build(self) -> Result<PolicyConfig, PolicyError> {
        let allowed_hosts = match self.hosts {
            None => PolicyConfig::default().allowed_hosts,
            Some(hosts) => {
                let mut resolved = BTreeSet::new();
                for host in hosts {
                    let host = resolve_host_alias(&host);
                    if host.is_empty() || host.contains("://") || host.contains('/') {
                        return Err(PolicyError::InvalidHost { host });
                    }
                    resolved.insert(host);
                }
                if resolved.is_empty() {
                    return Err(PolicyError::EmptyHostAllowList);
                }
                resolved
            }
        };

        let mut allowed_schemes: BTreeSet<String> =
            BASELINE_SCHEMES.iter().map(|s| s.to_string()).collect();
        for scheme in self.extra_schemes {
            let scheme = normalize_scheme(&scheme);
            if scheme.is_empty() {
                return Err(PolicyError::EmptyScheme);
            }
            allowed_schemes.insert(scheme);
        }

        let allowed_urls = self
            .urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();

        Ok(PolicyConfig {
            allowed_hosts,
            allowed_schemes,
            allowed_urls,
        })
    }
}

//! # Package Model
//!
//! Normalized, immutable view of the packages recorded in a lockfile.
//!
//! A [`PackageModel`] is produced once by the lockfile loader and then shared
//! read-only with every validator. Nothing in the crate hands out mutable
//! access to the entries, so validator results cannot depend on the order in
//! which validators run.

use serde::Serialize;

/// One package recorded in a lockfile.
///
/// The same `name` may appear several times when the lockfile records more
/// than one resolved version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    /// Package name, including any `@scope/` prefix.
    pub name: String,
    /// Resolved source URL. `None` when the lockfile recorded no source.
    pub resolved: Option<String>,
    /// Opaque metadata the validators do not inspect.
    #[serde(flatten)]
    pub metadata: PackageMetadata,
}

/// Lockfile metadata carried alongside an entry for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    /// Recorded version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Subresource integrity string, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Key the entry was recorded under (`node_modules/a/node_modules/b`,
    /// `"b@^1.0.0"`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl PackageEntry {
    /// Create an entry with no metadata.
    pub fn new(name: impl Into<String>, resolved: Option<String>) -> Self {
        Self {
            name: name.into(),
            resolved,
            metadata: PackageMetadata::default(),
        }
    }

    /// Attach metadata to the entry.
    pub fn with_metadata(mut self, metadata: PackageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Ordered, immutable sequence of lockfile entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageModel {
    entries: Vec<PackageEntry>,
}

impl PackageModel {
    /// Freeze a list of entries into a model. Entry order is preserved.
    pub fn new(entries: Vec<PackageEntry>) -> Self {
        Self { entries }
    }

    /// The entries in lockfile order.
    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    /// Iterate over the entries in lockfile order.
    pub fn iter(&self) -> std::slice::Iter<'_, PackageEntry> {
        self.entries.iter()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lockfile recorded no packages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PackageEntry> for PackageModel {
    fn from_iter<I: IntoIterator<Item = PackageEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PackageModel {
    type Item = &'a PackageEntry;
    type IntoIter = std::slice::Iter<'a, PackageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

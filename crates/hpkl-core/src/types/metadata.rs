//! Resolved package metadata.
//!
//! This is the JSON document a registry serves for one package version. The
//! same document is written next to the archive in the content cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Dependency, DependencyEntry, PackageUri, RemoteKind};
use crate::error::HpklResult;

/// Archive checksums
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    pub sha256: String,
}

/// Resolved descriptor for one package version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    pub package_uri: String,
    pub version: String,
    #[serde(default)]
    pub package_zip_url: String,
    #[serde(default)]
    pub package_zip_checksums: Checksums,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyEntry>,
    /// Fetcher that produced this value; never serialized
    #[serde(skip)]
    pub resolver_kind: RemoteKind,
}

/// Flattened resolution result keyed by package URI
pub type ResolvedSet = BTreeMap<String, Metadata>;

impl Metadata {
    /// Create metadata with the required fields only
    pub fn new(name: impl Into<String>, version: impl Into<String>, package_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            package_uri: package_uri.into(),
            ..Default::default()
        }
    }

    /// Parse the package URI
    pub fn parsed_uri(&self) -> HpklResult<PackageUri> {
        PackageUri::parse(&self.package_uri)
    }

    /// Parse the declared version
    pub fn semver(&self) -> HpklResult<semver::Version> {
        semver::Version::parse(&self.version).map_err(|source| crate::HpklError::VersionParse {
            version: self.version.clone(),
            source,
        })
    }

    /// This package's own dependencies as typed declarations
    pub fn declared_dependencies(&self) -> BTreeMap<String, Dependency> {
        self.dependencies
            .iter()
            .map(|(name, entry)| (name.clone(), Dependency::declare(name.as_str(), entry.uri.as_str())))
            .collect()
    }

    /// File stem used in the content cache, `name@version`
    pub fn file_stem(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Set the fetcher that produced this metadata
    pub fn resolved_by(mut self, kind: RemoteKind) -> Self {
        self.resolver_kind = kind;
        self
    }
}

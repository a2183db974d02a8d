//! Dependency declaration types.
//!
//! A `Dependency` is a named edge to a package URI. The transport used to
//! fetch it is decided once, when the dependency is declared.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Checksums;

/// Declared names with this suffix are fetched from an OCI registry
pub const OCI_NAME_SUFFIX: &str = ".oci";

/// Transport a dependency is fetched with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// OCI registry (manifest + blobs)
    Oci,
    /// Plain HTTP(S) metadata document and archive URL
    #[default]
    Http,
}

impl RemoteKind {
    /// Pick the transport from a declared dependency name
    pub fn from_declared_name(name: &str) -> Self {
        if name.ends_with(OCI_NAME_SUFFIX) {
            RemoteKind::Oci
        } else {
            RemoteKind::Http
        }
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteKind::Oci => f.write_str("oci"),
            RemoteKind::Http => f.write_str("http"),
        }
    }
}

/// Dependency reference edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub uri: String,
    pub kind: RemoteKind,
}

impl Dependency {
    /// Declare a dependency, deriving its transport from the name
    pub fn declare(name: impl Into<String>, uri: impl Into<String>) -> Self {
        let name = name.into();
        let kind = RemoteKind::from_declared_name(&name);
        Self {
            name,
            uri: uri.into(),
            kind,
        }
    }
}

/// Dependency entry as it appears in package metadata JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksums: Option<Checksums>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_picks_kind_from_name() {
        let oci = Dependency::declare("toml.oci", "package://host/toml@1.0.0");
        assert_eq!(oci.kind, RemoteKind::Oci);

        let http = Dependency::declare("toml", "package://host/toml@1.0.0");
        assert_eq!(http.kind, RemoteKind::Http);

        // Only a suffix counts
        let inner = Dependency::declare("oci.toml", "package://host/toml@1.0.0");
        assert_eq!(inner.kind, RemoteKind::Http);
    }

    #[test]
    fn test_remote_kind_display() {
        assert_eq!(RemoteKind::Oci.to_string(), "oci");
        assert_eq!(RemoteKind::Http.to_string(), "http");
        assert_eq!(RemoteKind::default(), RemoteKind::Http);
    }
}

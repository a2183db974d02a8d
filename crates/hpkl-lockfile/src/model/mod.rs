//! Lock file document

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LOCK_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Remote,
    Local,
}

/// One pinned dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    pub uri: String,
    /// Project directory relative to the resolving project (local only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Archive digests keyed by algorithm (remote only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksums: Option<BTreeMap<String, String>>,
}

impl ResolvedDependency {
    pub fn remote(uri: impl Into<String>, sha256: impl Into<String>) -> Self {
        let mut checksums = BTreeMap::new();
        checksums.insert("sha256".to_string(), sha256.into());
        Self {
            dependency_type: DependencyType::Remote,
            uri: uri.into(),
            path: None,
            checksums: Some(checksums),
        }
    }

    pub fn local(uri: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            dependency_type: DependencyType::Local,
            uri: uri.into(),
            path: Some(path.into()),
            checksums: None,
        }
    }
}

/// `PklProject.deps.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    pub schema_version: u32,
    /// Keyed by major-version identity, e.g. `package://host/pkg@1`
    pub resolved_dependencies: BTreeMap<String, ResolvedDependency>,
}

impl Default for LockFile {
    fn default() -> Self {
        Self {
            schema_version: LOCK_SCHEMA_VERSION,
            resolved_dependencies: BTreeMap::new(),
        }
    }
}

impl LockFile {
    /// Pretty JSON with two-space indentation and sorted keys
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let mut lock = LockFile::default();
        lock.resolved_dependencies.insert(
            "package://example.com/toml@1".to_string(),
            ResolvedDependency::remote("projectpackage://example.com/toml@1.0.2", "abc"),
        );
        lock.resolved_dependencies.insert(
            "package://example.com/sibling@2".to_string(),
            ResolvedDependency::local("projectpackage://example.com/sibling@2.0.0", "../sibling"),
        );

        let expected = r#"{
  "schemaVersion": 1,
  "resolvedDependencies": {
    "package://example.com/sibling@2": {
      "type": "local",
      "uri": "projectpackage://example.com/sibling@2.0.0",
      "path": "../sibling"
    },
    "package://example.com/toml@1": {
      "type": "remote",
      "uri": "projectpackage://example.com/toml@1.0.2",
      "checksums": {
        "sha256": "abc"
      }
    }
  }
}"#;
        assert_eq!(lock.to_json().unwrap(), expected);
    }

    #[test]
    fn test_parse_existing_lock() {
        let content = r#"{
            "schemaVersion": 1,
            "resolvedDependencies": {
                "package://example.com/toml@1": {
                    "type": "remote",
                    "uri": "projectpackage://example.com/toml@1.0.2",
                    "checksums": { "sha256": "abc" }
                }
            }
        }"#;

        let lock: LockFile = serde_json::from_str(content).unwrap();
        let entry = &lock.resolved_dependencies["package://example.com/toml@1"];
        assert_eq!(entry.dependency_type, DependencyType::Remote);
        assert_eq!(entry.path, None);
    }
}

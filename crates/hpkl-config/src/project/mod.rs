//! Project graph handed over by the evaluator
//!
//! Every node exposes its named remote dependency declarations and its named
//! local sub-projects, which recursively expose the same two maps.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use hpkl_core::error::HpklError;
use hpkl_core::utils::{absolutize, normalize_path};
use hpkl_core::{Dependency, PackageUri};
use serde::Deserialize;
use tracing::debug;

use crate::ConfigResult;

/// Default project graph document inside a project directory
pub const PROJECT_GRAPH_FILE: &str = "PklProject.json";

/// Remote dependency as written by the evaluator
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RemoteDeclaration {
    /// Bare URI string
    Simple(String),
    /// Object with a `uri` field
    Detailed { uri: String },
}

impl RemoteDeclaration {
    fn uri(&self) -> &str {
        match self {
            RemoteDeclaration::Simple(uri) => uri,
            RemoteDeclaration::Detailed { uri } => uri,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument {
    name: Option<String>,
    uri: Option<String>,
    project_dir: Option<String>,
    #[serde(default)]
    remote_dependencies: BTreeMap<String, RemoteDeclaration>,
    #[serde(default)]
    local_dependencies: BTreeMap<String, ProjectDocument>,
}

/// One project in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub name: String,
    /// Identity URI; always present on local sub-projects
    pub uri: Option<PackageUri>,
    /// Absolute project directory
    pub project_dir: Utf8PathBuf,
    pub remote_dependencies: BTreeMap<String, Dependency>,
    pub local_dependencies: BTreeMap<String, ProjectNode>,
}

impl ProjectNode {
    /// Load the project graph document at an absolute path
    pub fn load(path: &Utf8Path) -> ConfigResult<Self> {
        let dir = path.parent().unwrap_or(path);
        if !path.exists() {
            return Err(HpklError::ProjectNotFound {
                dir: dir.to_string(),
            });
        }

        debug!(path = %path, "Loading project graph");
        let content = std::fs::read_to_string(path)
            .map_err(|e| HpklError::io(format!("Failed to read {}", path), e))?;
        Self::from_json(&content, dir)
    }

    /// Parse a project graph document whose relative paths start at `base_dir`
    pub fn from_json(content: &str, base_dir: &Utf8Path) -> ConfigResult<Self> {
        let document: ProjectDocument =
            serde_json::from_str(content).map_err(|e| HpklError::ConfigValidation {
                field: "project graph".to_string(),
                reason: e.to_string(),
            })?;

        let project_dir = match &document.project_dir {
            Some(dir) => absolutize(base_dir, Utf8Path::new(dir)),
            None => absolutize(base_dir, Utf8Path::new(".")),
        };
        let uri = document.uri.as_deref().map(PackageUri::parse).transpose()?;
        let name = document
            .name
            .clone()
            .or_else(|| uri.as_ref().map(|u| u.name().to_string()))
            .or_else(|| project_dir.file_name().map(str::to_string))
            .unwrap_or_default();

        Self::from_document(name, uri, project_dir, document)
    }

    fn from_document(
        name: String,
        uri: Option<PackageUri>,
        project_dir: Utf8PathBuf,
        document: ProjectDocument,
    ) -> ConfigResult<Self> {
        let remote_dependencies = document
            .remote_dependencies
            .iter()
            .map(|(dep_name, decl)| (dep_name.clone(), Dependency::declare(dep_name.as_str(), decl.uri())))
            .collect();

        let mut local_dependencies = BTreeMap::new();
        for (local_name, child) in document.local_dependencies {
            let invalid = |reason: &str| HpklError::ConfigValidation {
                field: format!("localDependencies.{}", local_name),
                reason: reason.to_string(),
            };
            let child_uri = child.uri.as_deref().ok_or_else(|| invalid("missing uri"))?;
            let child_uri = PackageUri::parse(child_uri)?;
            let child_dir = child.project_dir.as_deref().ok_or_else(|| invalid("missing projectDir"))?;
            let child_dir = absolutize(&project_dir, Utf8Path::new(child_dir));

            let node = Self::from_document(
                child.name.clone().unwrap_or_else(|| local_name.clone()),
                Some(child_uri),
                child_dir,
                child,
            )?;
            local_dependencies.insert(local_name, node);
        }

        Ok(Self {
            name,
            uri,
            project_dir,
            remote_dependencies,
            local_dependencies,
        })
    }

    /// Every local sub-project reachable from this node, pre-order
    pub fn transitive_locals(&self) -> Vec<&ProjectNode> {
        let mut out = Vec::new();
        for child in self.local_dependencies.values() {
            out.push(child);
            out.extend(child.transitive_locals());
        }
        out
    }

    /// Fail unless this project and every transitive local live under `root_dir`
    pub fn ensure_within(&self, root_dir: &Utf8Path) -> ConfigResult<()> {
        let root_dir = normalize_path(root_dir);
        for node in std::iter::once(self).chain(self.transitive_locals()) {
            if !node.project_dir.starts_with(&root_dir) {
                return Err(HpklError::ConfigValidation {
                    field: "root_dir".to_string(),
                    reason: format!(
                        "project '{}' at {} is outside the root directory {}",
                        node.name, node.project_dir, root_dir
                    ),
                });
            }
        }
        Ok(())
    }

    /// Remote declarations of this node, then of each transitive local
    pub fn remote_dependency_sets(&self) -> Vec<&BTreeMap<String, Dependency>> {
        std::iter::once(self)
            .chain(self.transitive_locals())
            .map(|node| &node.remote_dependencies)
            .collect()
    }
}

//! Lock file construction
//!
//! Remote entries come from the deduplicated resolved set, local entries
//! from every sub-project reachable through the project graph. Both are
//! keyed by major-version identity; a local entry replaces a remote entry
//! with the same key.

use hpkl_config::ProjectNode;
use hpkl_core::error::HpklError;
use hpkl_core::utils::relative_path;
use hpkl_core::{HpklResult, PackageUri, ResolvedSet};
use tracing::debug;

use crate::model::{LockFile, ResolvedDependency};

/// Builds the lock file for one resolving project
pub struct LockFileBuilder<'a> {
    project: &'a ProjectNode,
}

impl<'a> LockFileBuilder<'a> {
    pub fn new(project: &'a ProjectNode) -> Self {
        Self { project }
    }

    pub fn build(&self, resolved: &ResolvedSet) -> HpklResult<LockFile> {
        let mut lock = LockFile::default();

        for (declared, metadata) in resolved {
            let uri = PackageUri::parse(declared).map_err(|e| e.for_dependency(&metadata.name))?;
            let entry = ResolvedDependency::remote(
                uri.to_project_package().to_string(),
                metadata.package_zip_checksums.sha256.as_str(),
            );
            lock.resolved_dependencies.insert(uri.major_identity(), entry);
        }

        for local in self.project.transitive_locals() {
            let uri = local.uri.as_ref().ok_or_else(|| HpklError::ConfigValidation {
                field: format!("localDependencies.{}", local.name),
                reason: "missing uri".to_string(),
            })?;
            let path = relative_path(&self.project.project_dir, &local.project_dir)?;
            debug!(name = %local.name, path = %path, "Local dependency");

            let entry = ResolvedDependency::local(uri.to_project_package().to_string(), path.as_str());
            lock.resolved_dependencies.insert(uri.major_identity(), entry);
        }

        Ok(lock)
    }
}

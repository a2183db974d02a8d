//! `hpkl resolve` command implementation.
//!
//! Runs the pipeline for each project directory in turn:
//! load graph, resolve, deduplicate, download, write the lock file.
//! Nothing is written for a project unless every step before the lock file
//! succeeded.

use camino::{Utf8Path, Utf8PathBuf};
use hpkl_cache::{CacheFirst, ContentCache, Downloader};
use hpkl_config::{AppConfig, ProjectNode};
use hpkl_core::error::HpklResult;
use hpkl_lockfile::{write_lock_file, LockFileBuilder};
use hpkl_registry::{AuthConfig, DefaultFetchers, Fetcher, FetcherSet};
use hpkl_resolver::{deduplicate, Resolver};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::CommandContext;

/// What one pipeline run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveSummary {
    pub project: String,
    /// Entries left after deduplication
    pub resolved: usize,
    /// Packages fetched into the content cache
    pub downloaded: usize,
    pub lock_file: Utf8PathBuf,
}

/// Execute `hpkl resolve [DIRS]...`
pub async fn execute(dirs: Vec<Utf8PathBuf>, ctx: &CommandContext) -> HpklResult<()> {
    let configs: Vec<AppConfig> = if dirs.is_empty() {
        vec![ctx.config.clone()]
    } else {
        dirs.iter().map(|dir| ctx.config.for_working_dir(dir)).collect()
    };

    let auth = ctx.config.registry_token.clone().map(AuthConfig::bearer);
    let fetchers = DefaultFetchers::connect(ctx.config.plain_http, auth)?;

    for config in &configs {
        let start_time = Instant::now();
        let summary = run_pipeline(config, fetchers.oci.clone(), fetchers.http.clone()).await?;

        ctx.output.success(&format!(
            "Resolved {} packages for {} in {:.2}s",
            summary.resolved,
            summary.project,
            start_time.elapsed().as_secs_f64()
        ));
        if summary.downloaded > 0 {
            ctx.output.info(&format!("Downloaded {} packages", summary.downloaded));
        }
        ctx.output.info(&format!("Wrote {}", display_path(&config.working_dir, &summary.lock_file)));
    }

    Ok(())
}

/// Resolve one project and write its lock file
///
/// Metadata fetched by an earlier run is read from the content cache, so a
/// repeated run against a populated cache touches neither fetcher.
pub async fn run_pipeline<O: Fetcher, H: Fetcher>(config: &AppConfig, oci: O, http: H) -> HpklResult<ResolveSummary> {
    let project = ProjectNode::load(&config.project_graph_path())?;
    info!(project = %project.name, dir = %project.project_dir, "Loaded project graph");
    if let Some(root_dir) = &config.root_dir {
        project.ensure_within(root_dir)?;
    }

    let cache = ContentCache::new(config.package_cache_dir(), config.metadata_cache_dir());
    let fetchers = Arc::new(FetcherSet::new(
        CacheFirst::new(cache.clone(), oci),
        CacheFirst::new(cache.clone(), http),
    ));

    let mut resolver = Resolver::new(fetchers.clone());
    let resolved = resolver.resolve_all(project.remote_dependency_sets()).await?;
    let resolved = deduplicate(resolved)?;
    info!(packages = resolved.len(), "Resolved dependencies");

    let downloaded = Downloader::new(cache, fetchers).download(&resolved).await?;

    let lock = LockFileBuilder::new(&project).build(&resolved)?;
    let lock_file = config.lock_file_path();
    write_lock_file(&lock_file, &lock)?;

    Ok(ResolveSummary {
        project: project.name,
        resolved: resolved.len(),
        downloaded,
        lock_file,
    })
}

fn display_path(base: &Utf8Path, path: &Utf8Path) -> String {
    path.strip_prefix(base)
        .map(|relative| relative.to_string())
        .unwrap_or_else(|_| path.to_string())
}

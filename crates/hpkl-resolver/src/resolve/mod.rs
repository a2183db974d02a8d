//! Recursive metadata resolution
//!
//! Walks the dependency tree depth-first, fetching metadata for each declared
//! URI once per run. Every URI encountered lands in the returned set exactly
//! once; the first metadata seen for a URI is kept.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hpkl_core::{Dependency, HpklResult, Metadata, ResolvedSet};
use hpkl_registry::{Fetcher, FetcherSet};
use tracing::{debug, error, info};

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = HpklResult<()>> + 'a>>;

/// Resolves declared dependencies to their transitive metadata closure
pub struct Resolver<O, H> {
    fetchers: Arc<FetcherSet<O, H>>,
    /// Metadata fetched during this run, keyed by declared URI
    cache: HashMap<String, Metadata>,
}

impl<O: Fetcher, H: Fetcher> Resolver<O, H> {
    pub fn new(fetchers: Arc<FetcherSet<O, H>>) -> Self {
        Self {
            fetchers,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct URIs fetched so far
    pub fn fetched(&self) -> usize {
        self.cache.len()
    }

    /// Resolve one set of declarations
    ///
    /// Stops at the first failing dependency; the error names it.
    pub async fn resolve(&mut self, dependencies: &BTreeMap<String, Dependency>) -> HpklResult<ResolvedSet> {
        let mut resolved = ResolvedSet::new();
        self.resolve_into(dependencies, &mut resolved).await?;

        debug!(declared = dependencies.len(), resolved = resolved.len(), "Resolution complete");
        Ok(resolved)
    }

    /// Resolve several declaration sets into one accumulator
    ///
    /// Sets are visited in order and URIs already present are left alone, so
    /// the earliest occurrence wins.
    pub async fn resolve_all<'a, I>(&mut self, sets: I) -> HpklResult<ResolvedSet>
    where
        I: IntoIterator<Item = &'a BTreeMap<String, Dependency>>,
    {
        let mut resolved = ResolvedSet::new();
        for dependencies in sets {
            self.resolve_into(dependencies, &mut resolved).await?;
        }
        Ok(resolved)
    }

    fn resolve_into<'a>(
        &'a mut self,
        dependencies: &'a BTreeMap<String, Dependency>,
        resolved: &'a mut ResolvedSet,
    ) -> ResolveFuture<'a>
    where
        O: 'a,
        H: 'a,
    {
        Box::pin(async move {
            for (name, dependency) in dependencies {
                if let Some(cached) = self.cache.get(&dependency.uri) {
                    debug!(name = %name, uri = %dependency.uri, "Already resolved");
                    resolved
                        .entry(dependency.uri.clone())
                        .or_insert_with(|| cached.clone());
                    continue;
                }

                info!(name = %name, uri = %dependency.uri, kind = %dependency.kind, "Resolving");
                let metadata = match self
                    .fetchers
                    .resolve_metadata(dependency.kind, &dependency.uri)
                    .await
                {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        error!(name = %name, uri = %dependency.uri, error = %e, "Failed to resolve");
                        return Err(e.for_dependency(name));
                    },
                };

                // Record before descending so cycles terminate
                self.cache.insert(dependency.uri.clone(), metadata.clone());
                resolved
                    .entry(dependency.uri.clone())
                    .or_insert_with(|| metadata.clone());

                let children = metadata.declared_dependencies();
                if !children.is_empty() {
                    self.resolve_into(&children, resolved).await?;
                }
            }
            Ok(())
        })
    }
}

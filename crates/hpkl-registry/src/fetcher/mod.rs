//! The fetcher capability and transport selection
//!
//! Each strategy resolves metadata for a package URI and the archive for
//! resolved metadata. `FetcherSet` picks the strategy from the `RemoteKind`
//! carried by a dependency or by metadata.

use hpkl_core::{Metadata, RemoteKind};

use crate::http::HttpFetcher;
use crate::oci::{AuthConfig, OciFetcher};
use crate::RegistryResult;

/// Metadata and archive retrieval for one transport
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Fetch and parse the metadata document for a package URI
    async fn resolve_metadata(&self, uri: &str) -> RegistryResult<Metadata>;

    /// Fetch the raw archive bytes for resolved metadata
    async fn resolve_archive(&self, metadata: &Metadata) -> RegistryResult<Vec<u8>>;
}

/// One fetcher per transport
#[derive(Debug, Clone)]
pub struct FetcherSet<O, H> {
    pub oci: O,
    pub http: H,
}

/// Fetchers talking to real registries
pub type DefaultFetchers = FetcherSet<OciFetcher, HttpFetcher>;

impl<O: Fetcher, H: Fetcher> FetcherSet<O, H> {
    pub fn new(oci: O, http: H) -> Self {
        Self { oci, http }
    }

    /// Resolve metadata with the fetcher for `kind`, tagging the result
    pub async fn resolve_metadata(&self, kind: RemoteKind, uri: &str) -> RegistryResult<Metadata> {
        let metadata = match kind {
            RemoteKind::Oci => self.oci.resolve_metadata(uri).await?,
            RemoteKind::Http => self.http.resolve_metadata(uri).await?,
        };
        Ok(metadata.resolved_by(kind))
    }

    /// Resolve the archive with the fetcher that produced the metadata
    pub async fn resolve_archive(&self, metadata: &Metadata) -> RegistryResult<Vec<u8>> {
        match metadata.resolver_kind {
            RemoteKind::Oci => self.oci.resolve_archive(metadata).await,
            RemoteKind::Http => self.http.resolve_archive(metadata).await,
        }
    }
}

impl DefaultFetchers {
    /// Build both network fetchers
    pub fn connect(plain_http: bool, auth: Option<AuthConfig>) -> RegistryResult<Self> {
        Ok(Self {
            oci: OciFetcher::new(plain_http, auth)?,
            http: HttpFetcher::new(plain_http)?,
        })
    }
}

//! Plain HTTP fetcher
//!
//! Metadata lives at the package URI itself with the scheme swapped for
//! `https` (or `http` with `--plain-http`); the archive lives at the
//! `packageZipUrl` recorded in the metadata.

use std::time::Duration;

use hpkl_core::error::HpklError;
use hpkl_core::{Metadata, PackageUri, RemoteKind};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tracing::{debug, error};

use crate::fetcher::Fetcher;
use crate::{RegistryResult, USER_AGENT};

/// Fetcher for packages served over plain HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Use `http` instead of `https` for metadata requests
    plain_http: bool,
}

impl HttpFetcher {
    /// Create a fetcher with its own connection pool
    pub fn new(plain_http: bool) -> RegistryResult<Self> {
        Ok(Self::with_client(build_client()?, plain_http))
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: Client, plain_http: bool) -> Self {
        Self { client, plain_http }
    }

    /// Metadata URL for a package URI
    pub fn metadata_url(&self, uri: &str) -> RegistryResult<String> {
        let scheme = if self.plain_http { "http" } else { "https" };
        Ok(PackageUri::parse(uri)?.with_scheme(scheme).to_string())
    }
}

impl Fetcher for HttpFetcher {
    async fn resolve_metadata(&self, uri: &str) -> RegistryResult<Metadata> {
        let url = self.metadata_url(uri)?;
        debug!(uri = %uri, url = %url, "Fetching metadata");

        let response = get(&self.client, &url).await?;
        let body = response.bytes().await.map_err(|e| {
            HpklError::network(format!("Failed to read metadata from {}", url), e)
        })?;

        let metadata: Metadata = serde_json::from_slice(&body).map_err(|source| {
            error!(uri = %uri, "Metadata is not valid JSON");
            HpklError::MetadataParse {
                uri: uri.to_string(),
                source,
            }
        })?;

        Ok(metadata.resolved_by(RemoteKind::Http))
    }

    async fn resolve_archive(&self, metadata: &Metadata) -> RegistryResult<Vec<u8>> {
        if metadata.package_zip_url.is_empty() {
            return Err(HpklError::Registry {
                message: format!("Metadata for {} has no packageZipUrl", metadata.package_uri),
            });
        }
        debug!(url = %metadata.package_zip_url, "Fetching archive");

        let response = get(&self.client, &metadata.package_zip_url).await?;
        let bytes = response.bytes().await.map_err(|e| {
            HpklError::network(
                format!("Failed to read archive from {}", metadata.package_zip_url),
                e,
            )
        })?;

        Ok(bytes.to_vec())
    }
}

/// Build the shared client configuration
pub(crate) fn build_client() -> RegistryResult<Client> {
    client_builder()
        .build()
        .map_err(|e| HpklError::network("Failed to create HTTP client".to_string(), e))
}

pub(crate) fn client_builder() -> ClientBuilder {
    ClientBuilder::new()
        // Connection pooling configuration
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        // Request timeout
        .timeout(Duration::from_secs(30))
        .gzip(true)
        .user_agent(USER_AGENT)
}

/// GET a URL and map error statuses
pub(crate) async fn get(client: &Client, url: &str) -> RegistryResult<Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HpklError::network(format!("Failed to fetch {}", url), e))?;
    check_status(response, url)
}

/// Any status of 300 or above is a failure; 404 means the package is missing
pub(crate) fn check_status(response: Response, url: &str) -> RegistryResult<Response> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(HpklError::PackageNotFound {
            uri: url.to_string(),
        }),
        status if status.as_u16() >= 300 => {
            error!(url = %url, status = %status, "HTTP error");
            Err(HpklError::Network {
                message: format!("{} returned status {}", url, status),
                source: None,
            })
        },
        _ => Ok(response),
    }
}

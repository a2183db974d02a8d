//! OCI registry client and fetcher
//!
//! Packages are stored as OCI artifacts: a manifest whose layers hold the
//! metadata document and the package archive. Only pulling is supported.

use hpkl_core::error::HpklError;
use hpkl_core::{Metadata, PackageUri, RemoteKind};
use reqwest::Client;
use tracing::{debug, info};

use crate::api::{OciManifest, METADATA_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE, PACKAGE_LAYER_MEDIA_TYPE};
use crate::fetcher::Fetcher;
use crate::http::{check_status, client_builder};
use crate::RegistryResult;

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

impl AuthConfig {
    /// Bearer token authentication
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    fn header_value(&self) -> Option<String> {
        use base64::{engine::general_purpose, Engine as _};

        if let Some(token) = &self.token {
            Some(format!("Bearer {}", token))
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let encoded = general_purpose::STANDARD.encode(format!("{}:{}", username, password));
            Some(format!("Basic {}", encoded))
        } else {
            None
        }
    }
}

/// Blobs pulled for one package reference
#[derive(Debug, Clone)]
pub struct PullResult {
    /// Reference that was pulled, `host/path:tag`
    pub reference: String,
    /// Raw metadata document
    pub metadata: Vec<u8>,
    /// Raw package archive, when requested
    pub archive: Option<Vec<u8>>,
}

/// Minimal OCI distribution client
#[derive(Debug, Clone)]
pub struct OciClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Talk `http://` to the registry
    plain_http: bool,
}

impl OciClient {
    /// Create a registry client
    pub fn new(plain_http: bool, auth: Option<AuthConfig>) -> RegistryResult<Self> {
        let mut builder = client_builder();

        if let Some(value) = auth.as_ref().and_then(AuthConfig::header_value) {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::AUTHORIZATION,
                value
                    .parse()
                    .map_err(|e| HpklError::network("Invalid registry credentials".to_string(), e))?,
            );
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| HpklError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self { client, plain_http })
    }

    fn base_url(&self, uri: &PackageUri) -> String {
        let scheme = if self.plain_http { "http" } else { "https" };
        format!("{}://{}/v2/{}", scheme, uri.authority(), uri.oci_repository())
    }

    /// Fetch the manifest for a package version
    pub async fn manifest(&self, uri: &PackageUri) -> RegistryResult<OciManifest> {
        let tag = uri.version().to_string().replace('+', "_");
        let url = format!("{}/manifests/{}", self.base_url(uri), tag);
        debug!(url = %url, "Fetching manifest");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, OCI_MANIFEST_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| HpklError::network(format!("Failed to fetch manifest {}", url), e))?;
        let response = check_status(response, &url)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| HpklError::network(format!("Failed to read manifest {}", url), e))?;
        serde_json::from_slice(&body).map_err(|e| HpklError::Registry {
            message: format!("Invalid manifest for {}: {}", uri.to_oci_reference(), e),
        })
    }

    /// Fetch a blob by digest
    pub async fn blob(&self, uri: &PackageUri, digest: &str) -> RegistryResult<Vec<u8>> {
        let url = format!("{}/blobs/{}", self.base_url(uri), digest);
        debug!(url = %url, "Fetching blob");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HpklError::network(format!("Failed to fetch blob {}", url), e))?;
        let response = check_status(response, &url)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HpklError::network(format!("Failed to read blob {}", url), e))?;
        Ok(bytes.to_vec())
    }

    /// Pull the metadata layer, and the archive layer when `with_package`
    pub async fn pull(&self, uri: &PackageUri, with_package: bool) -> RegistryResult<PullResult> {
        let reference = uri.to_oci_reference();
        info!(reference = %reference, with_package, "Pulling");

        let manifest = self.manifest(uri).await?;

        let metadata_layer = manifest.layer(METADATA_MEDIA_TYPE).ok_or_else(|| HpklError::Registry {
            message: format!("could not load metadata with mediatype {}", METADATA_MEDIA_TYPE),
        })?;
        let package_layer = if with_package {
            Some(manifest.layer(PACKAGE_LAYER_MEDIA_TYPE).ok_or_else(|| HpklError::Registry {
                message: format!(
                    "manifest does not contain a layer with mediatype {}",
                    PACKAGE_LAYER_MEDIA_TYPE
                ),
            })?)
        } else {
            None
        };

        let metadata = self.blob(uri, &metadata_layer.digest).await?;
        let archive = match package_layer {
            Some(layer) => Some(self.blob(uri, &layer.digest).await?),
            None => None,
        };

        Ok(PullResult {
            reference,
            metadata,
            archive,
        })
    }
}

/// Fetcher for packages stored in an OCI registry
#[derive(Debug, Clone)]
pub struct OciFetcher {
    client: OciClient,
}

impl OciFetcher {
    pub fn new(plain_http: bool, auth: Option<AuthConfig>) -> RegistryResult<Self> {
        Ok(Self {
            client: OciClient::new(plain_http, auth)?,
        })
    }

    pub fn with_client(client: OciClient) -> Self {
        Self { client }
    }
}

impl Fetcher for OciFetcher {
    async fn resolve_metadata(&self, uri: &str) -> RegistryResult<Metadata> {
        let package_uri = PackageUri::parse(uri)?;
        let result = self.client.pull(&package_uri, false).await?;

        let metadata: Metadata =
            serde_json::from_slice(&result.metadata).map_err(|source| HpklError::MetadataParse {
                uri: uri.to_string(),
                source,
            })?;

        Ok(metadata.resolved_by(RemoteKind::Oci))
    }

    async fn resolve_archive(&self, metadata: &Metadata) -> RegistryResult<Vec<u8>> {
        let package_uri = metadata.parsed_uri()?;
        let result = self.client.pull(&package_uri, true).await?;

        result.archive.ok_or_else(|| HpklError::Registry {
            message: format!("No archive pulled for {}", result.reference),
        })
    }
}

//! OCI distribution API types

use serde::{Deserialize, Serialize};

/// Media type of the manifest config blob
pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.hpkl.io.config.v1+json";

/// Media type of the package metadata layer
pub const METADATA_MEDIA_TYPE: &str = "application/vnd.hpkl.io.metadata.v1+json";

/// Media type of the package archive layer
pub const PACKAGE_LAYER_MEDIA_TYPE: &str = "application/vnd.hpkl.io.pkg.content.v1.tar+gzip";

/// Manifest media type requested from the registry
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// OCI image manifest
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OciManifest {
    /// Manifest schema version (always 2)
    pub schema_version: u32,
    /// Manifest media type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Config blob descriptor
    pub config: OciDescriptor,
    /// Layer descriptors
    #[serde(default)]
    pub layers: Vec<OciDescriptor>,
}

/// Content descriptor for a blob
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OciDescriptor {
    /// Blob media type
    pub media_type: String,
    /// Content digest, e.g. `sha256:abc...`
    pub digest: String,
    /// Blob size in bytes
    pub size: u64,
}

impl OciManifest {
    /// First layer with the given media type
    pub fn layer(&self, media_type: &str) -> Option<&OciDescriptor> {
        self.layers.iter().find(|layer| layer.media_type == media_type)
    }
}

//! Package fetchers for hpkl
//!
//! This crate provides the `Fetcher` capability and its two strategies: an
//! OCI registry client that pulls metadata and archive layers by digest, and
//! a plain HTTP client that GETs a metadata document and a separate archive.

pub mod api;
pub mod fetcher;
pub mod http;
pub mod oci;

// Re-export main types
pub use api::{OciDescriptor, OciManifest};
pub use fetcher::{DefaultFetchers, Fetcher, FetcherSet};
pub use http::HttpFetcher;
pub use oci::{AuthConfig, OciClient, OciFetcher, PullResult};

use hpkl_core::error::HpklError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, HpklError>;

/// User agent sent with every request
pub(crate) const USER_AGENT: &str = concat!("hpkl/", env!("CARGO_PKG_VERSION"));

//! Content cache store and downloader

use camino::{Utf8Path, Utf8PathBuf};
use hpkl_core::error::HpklError;
use hpkl_core::{Metadata, PackageUri, ResolvedSet};
use hpkl_registry::{Fetcher, FetcherSet};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

use crate::CacheResult;

/// On-disk package cache
#[derive(Debug, Clone)]
pub struct ContentCache {
    /// Package root (`<cache>/package-2`)
    package_root: Utf8PathBuf,
    /// Metadata documents for every version ever fetched (`<cache>/metadata`)
    metadata_root: Utf8PathBuf,
}

impl ContentCache {
    /// Open a cache from its package and metadata roots; nothing is created
    pub fn new<P: AsRef<Utf8Path>, M: AsRef<Utf8Path>>(package_root: P, metadata_root: M) -> Self {
        Self {
            package_root: package_root.as_ref().to_path_buf(),
            metadata_root: metadata_root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding one package version
    pub fn package_dir(&self, metadata: &Metadata) -> CacheResult<Utf8PathBuf> {
        let uri = metadata
            .parsed_uri()
            .map_err(|e| e.for_dependency(&metadata.name))?;
        Ok(self.package_root.join(uri.cache_relative_path()))
    }

    /// Whether the package directory already exists
    pub fn contains(&self, metadata: &Metadata) -> CacheResult<bool> {
        Ok(self.package_dir(metadata)?.exists())
    }

    /// Write the metadata document and archive into the package directory
    pub fn store(&self, metadata: &Metadata, archive: &[u8]) -> CacheResult<Utf8PathBuf> {
        let dir = self.package_dir(metadata)?;
        fs::create_dir_all(&dir)
            .map_err(|e| HpklError::io(format!("Failed to create cache directory {}", dir), e))?;

        let stem = metadata.file_stem();
        let metadata_path = dir.join(format!("{}.json", stem));
        fs::write(&metadata_path, encode(metadata)?)
            .map_err(|e| HpklError::io(format!("Failed to write {}", metadata_path), e))?;

        let archive_path = dir.join(format!("{}.zip", stem));
        fs::write(&archive_path, archive)
            .map_err(|e| HpklError::io(format!("Failed to write {}", archive_path), e))?;

        Ok(dir)
    }

    /// Where the metadata document fetched for `uri` is kept
    ///
    /// Keyed by the requested URI alone, so lookups never depend on the
    /// package name inside the document.
    pub fn metadata_path(&self, uri: &PackageUri) -> Utf8PathBuf {
        let relative = uri.cache_relative_path();
        self.metadata_root.join(format!("{}.json", relative))
    }

    /// Remember the metadata document fetched for `uri`
    pub fn store_metadata(&self, uri: &str, metadata: &Metadata) -> CacheResult<()> {
        let path = self.metadata_path(&PackageUri::parse(uri)?);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| HpklError::io(format!("Failed to create cache directory {}", parent), e))?;
        }
        fs::write(&path, encode(metadata)?).map_err(|e| HpklError::io(format!("Failed to write {}", path), e))
    }

    /// Read the metadata document previously fetched for `uri`, if present
    pub fn load_metadata(&self, uri: &str) -> CacheResult<Option<Metadata>> {
        let path = self.metadata_path(&PackageUri::parse(uri)?);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read(&path).map_err(|e| HpklError::io(format!("Failed to read {}", path), e))?;
        let metadata = serde_json::from_slice(&content).map_err(|source| HpklError::MetadataParse {
            uri: uri.to_string(),
            source,
        })?;
        Ok(Some(metadata))
    }
}

fn encode(metadata: &Metadata) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(metadata).map_err(|source| HpklError::MetadataParse {
        uri: metadata.package_uri.clone(),
        source,
    })
}

/// Serves metadata from the content cache before asking the network
///
/// Every document fetched through it is kept, including versions that later
/// lose deduplication and are never downloaded.
#[derive(Debug, Clone)]
pub struct CacheFirst<F> {
    cache: ContentCache,
    inner: F,
}

impl<F> CacheFirst<F> {
    pub fn new(cache: ContentCache, inner: F) -> Self {
        Self { cache, inner }
    }
}

impl<F: Fetcher> Fetcher for CacheFirst<F> {
    async fn resolve_metadata(&self, uri: &str) -> CacheResult<Metadata> {
        if let Some(metadata) = self.cache.load_metadata(uri)? {
            debug!(uri = %uri, "Metadata from cache");
            return Ok(metadata);
        }
        let metadata = self.inner.resolve_metadata(uri).await?;
        self.cache.store_metadata(uri, &metadata)?;
        Ok(metadata)
    }

    async fn resolve_archive(&self, metadata: &Metadata) -> CacheResult<Vec<u8>> {
        self.inner.resolve_archive(metadata).await
    }
}

/// Fetches archives for resolved packages missing from the cache
pub struct Downloader<O, H> {
    cache: ContentCache,
    fetchers: Arc<FetcherSet<O, H>>,
}

impl<O: Fetcher, H: Fetcher> Downloader<O, H> {
    pub fn new(cache: ContentCache, fetchers: Arc<FetcherSet<O, H>>) -> Self {
        Self { cache, fetchers }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Download every package not already cached
    ///
    /// Returns how many packages were fetched. The first failure aborts;
    /// files already written for earlier packages stay in place.
    pub async fn download(&self, resolved: &ResolvedSet) -> CacheResult<usize> {
        let mut downloaded = 0;

        for metadata in resolved.values() {
            let dir = self.cache.package_dir(metadata)?;
            if dir.exists() {
                debug!(package = %metadata.file_stem(), dir = %dir, "Already cached");
                continue;
            }

            info!(package = %metadata.file_stem(), kind = %metadata.resolver_kind, "Downloading");
            let archive = self
                .fetchers
                .resolve_archive(metadata)
                .await
                .map_err(|e| e.for_dependency(&metadata.name))?;
            self.cache.store(metadata, &archive)?;
            downloaded += 1;
        }

        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpkl_core::RemoteKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct ArchiveServer {
        served: AtomicUsize,
        fail: bool,
    }

    impl Fetcher for ArchiveServer {
        async fn resolve_metadata(&self, uri: &str) -> CacheResult<Metadata> {
            Err(HpklError::PackageNotFound { uri: uri.to_string() })
        }

        async fn resolve_archive(&self, metadata: &Metadata) -> CacheResult<Vec<u8>> {
            if self.fail {
                return Err(HpklError::Network {
                    message: "connection reset".to_string(),
                    source: None,
                });
            }
            self.served.fetch_add(1, Ordering::SeqCst);
            Ok(format!("zip:{}", metadata.name).into_bytes())
        }
    }

    /// Serves one metadata document and counts requests
    struct DocumentServer {
        document: Metadata,
        requests: AtomicUsize,
    }

    impl DocumentServer {
        fn new(document: Metadata) -> Self {
            Self {
                document,
                requests: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for DocumentServer {
        async fn resolve_metadata(&self, _uri: &str) -> CacheResult<Metadata> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.clone())
        }

        async fn resolve_archive(&self, metadata: &Metadata) -> CacheResult<Vec<u8>> {
            Ok(metadata.name.clone().into_bytes())
        }
    }

    fn cache(dir: &tempfile::TempDir) -> ContentCache {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        ContentCache::new(root.join("package-2"), root.join("metadata"))
    }

    fn metadata(name: &str, version: &str) -> Metadata {
        let mut metadata = Metadata::new(
            name,
            version,
            format!("package://example.com/pantry/{}@{}", name, version),
        );
        metadata.package_zip_checksums.sha256 = "abc".to_string();
        metadata
    }

    fn resolved(entries: &[Metadata]) -> ResolvedSet {
        entries
            .iter()
            .map(|m| (m.package_uri.clone(), m.clone()))
            .collect()
    }

    #[test]
    fn test_cache_layout() {
        let cache = ContentCache::new("/cache/package-2", "/cache/metadata");
        let toml = metadata("toml", "1.0.2");

        let dir = cache.package_dir(&toml).unwrap();
        assert_eq!(dir, Utf8PathBuf::from("/cache/package-2/example.com/pantry/toml@1.0.2"));

        let uri = PackageUri::parse(&toml.package_uri).unwrap();
        assert_eq!(
            cache.metadata_path(&uri),
            Utf8PathBuf::from("/cache/metadata/example.com/pantry/toml@1.0.2.json")
        );
    }

    #[test]
    fn test_store_writes_metadata_and_archive() {
        let temp = tempdir().unwrap();
        let cache = cache(&temp);
        let toml = metadata("toml", "1.0.2");

        let dir = cache.store(&toml, b"archive").unwrap();

        assert!(cache.contains(&toml).unwrap());
        assert_eq!(fs::read(dir.join("toml@1.0.2.zip")).unwrap(), b"archive".to_vec());

        let written: Metadata =
            serde_json::from_slice(&fs::read(dir.join("toml@1.0.2.json")).unwrap()).unwrap();
        assert_eq!(written, toml);
    }

    #[tokio::test]
    async fn test_download_skips_cached_packages() {
        let temp = tempdir().unwrap();
        let fetchers = Arc::new(FetcherSet::new(ArchiveServer::default(), ArchiveServer::default()));
        let downloader = Downloader::new(cache(&temp), fetchers.clone());
        let set = resolved(&[metadata("toml", "1.0.2"), metadata("base", "2.0.0").resolved_by(RemoteKind::Oci)]);

        assert_eq!(downloader.download(&set).await.unwrap(), 2);
        assert_eq!(fetchers.oci.served.load(Ordering::SeqCst), 1);
        assert_eq!(fetchers.http.served.load(Ordering::SeqCst), 1);

        // Second run finds both directories
        assert_eq!(downloader.download(&set).await.unwrap(), 0);
        assert_eq!(fetchers.http.served.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_download_failure_names_package() {
        let temp = tempdir().unwrap();
        let failing = ArchiveServer {
            fail: true,
            ..Default::default()
        };
        let fetchers = Arc::new(FetcherSet::new(ArchiveServer::default(), failing));
        let downloader = Downloader::new(cache(&temp), fetchers);
        let toml = metadata("toml", "1.0.2");

        let err = downloader.download(&resolved(&[toml.clone()])).await.unwrap_err();

        assert!(matches!(err, HpklError::Dependency { ref name, .. } if name == "toml"));
        assert!(!downloader.cache().contains(&toml).unwrap());
    }

    #[tokio::test]
    async fn test_cache_first_keeps_fetched_metadata() {
        let temp = tempdir().unwrap();
        let cache = cache(&temp);
        let toml = metadata("toml", "1.0.2");
        let fetcher = CacheFirst::new(cache.clone(), DocumentServer::new(toml.clone()));

        let first = fetcher.resolve_metadata(&toml.package_uri).await.unwrap();
        let second = fetcher.resolve_metadata(&toml.package_uri).await.unwrap();

        assert_eq!(first, toml);
        assert_eq!(second, toml);
        assert_eq!(fetcher.inner.requests.load(Ordering::SeqCst), 1);
        // Knowing the metadata does not mark the package as downloaded
        assert!(!cache.contains(&toml).unwrap());
    }

    #[tokio::test]
    async fn test_cache_first_miss_propagates_fetch_error() {
        let temp = tempdir().unwrap();
        let fetcher = CacheFirst::new(cache(&temp), ArchiveServer::default());

        let miss = fetcher.resolve_metadata("package://example.com/pantry/toml@1.0.2").await;
        assert!(matches!(miss, Err(HpklError::PackageNotFound { .. })));
    }

    #[tokio::test]
    async fn test_metadata_lookup_ignores_document_name() {
        let temp = tempdir().unwrap();
        let cache = cache(&temp);
        let uri = "package://example.com/pantry/toml@1.0.0";
        let renamed = Metadata::new("pkl.toml", "1.0.0", uri);

        cache.store_metadata(uri, &renamed).unwrap();
        assert_eq!(cache.load_metadata(uri).unwrap(), Some(renamed.clone()));

        let fetcher = CacheFirst::new(cache, DocumentServer::new(renamed.clone()));
        assert_eq!(fetcher.resolve_metadata(uri).await.unwrap(), renamed);
        assert_eq!(fetcher.inner.requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_metadata_rejects_corrupt_document() {
        let temp = tempdir().unwrap();
        let cache = cache(&temp);
        let toml = metadata("toml", "1.0.2");
        cache.store_metadata(&toml.package_uri, &toml).unwrap();
        let path = cache.metadata_path(&PackageUri::parse(&toml.package_uri).unwrap());
        fs::write(path, "{").unwrap();

        let result = cache.load_metadata(&toml.package_uri);
        assert!(matches!(result, Err(HpklError::MetadataParse { .. })));
    }
}

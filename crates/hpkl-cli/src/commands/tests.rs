//! Unit tests for CLI commands.

use super::resolve::run_pipeline;
use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use hpkl_core::{DependencyEntry, HpklError, Metadata};
use hpkl_lockfile::{DependencyType, LockFile};
use hpkl_registry::Fetcher;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory registry shared between clones
#[derive(Clone, Default)]
struct FakeRegistry {
    packages: Arc<HashMap<String, Metadata>>,
    metadata_calls: Arc<AtomicUsize>,
    archive_calls: Arc<AtomicUsize>,
}

impl FakeRegistry {
    fn new(packages: &[(&str, &str, &[&str])]) -> Self {
        let packages = packages
            .iter()
            .map(|(name, version, deps)| {
                let uri = uri(name, version);
                let mut metadata = Metadata::new(*name, *version, uri.as_str());
                metadata.package_zip_url = format!("https://example.com/{}@{}.zip", name, version);
                metadata.package_zip_checksums.sha256 = format!("{}-{}-sha", name, version);
                for dep in deps.iter() {
                    let (dep_name, dep_version) = dep.split_once('@').unwrap();
                    metadata.dependencies.insert(
                        dep_name.to_string(),
                        DependencyEntry {
                            uri: self::uri(dep_name, dep_version),
                            checksums: None,
                        },
                    );
                }
                (uri, metadata)
            })
            .collect();

        Self {
            packages: Arc::new(packages),
            ..Default::default()
        }
    }

    fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    fn archive_calls(&self) -> usize {
        self.archive_calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for FakeRegistry {
    async fn resolve_metadata(&self, uri: &str) -> HpklResult<Metadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.packages
            .get(uri)
            .cloned()
            .ok_or_else(|| HpklError::PackageNotFound { uri: uri.to_string() })
    }

    async fn resolve_archive(&self, metadata: &Metadata) -> HpklResult<Vec<u8>> {
        self.archive_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("archive:{}", metadata.file_stem()).into_bytes())
    }
}

fn uri(name: &str, version: &str) -> String {
    format!("package://example.com/pantry/{}@{}", name, version)
}

/// Temporary workspace with `app/` as the project and `cache/` as the cache
struct Workspace {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new(graph: serde_json::Value) -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/PklProject.json"), graph.to_string()).unwrap();
        Self { _temp: temp, root }
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            cache_dir: self.root.join("cache"),
            default_cache_dir: self.root.join("default-cache"),
            working_dir: self.root.join("app"),
            current_dir: self.root.clone(),
            root_dir: None,
            plain_http: false,
            registry_token: None,
            project_graph: None,
        }
    }

    fn lock_path(&self) -> Utf8PathBuf {
        self.root.join("app/PklProject.deps.json")
    }

    fn read_lock(&self) -> LockFile {
        serde_json::from_str(&fs::read_to_string(self.lock_path()).unwrap()).unwrap()
    }

    fn cached(&self, name: &str, version: &str) -> bool {
        self.root
            .join("cache/package-2/example.com/pantry")
            .join(format!("{}@{}", name, version))
            .join(format!("{}@{}.zip", name, version))
            .exists()
    }
}

fn graph() -> serde_json::Value {
    serde_json::json!({
        "name": "app",
        "remoteDependencies": {
            "toml": { "uri": uri("toml", "1.0.0") },
            "base": uri("base", "2.0.0")
        },
        "localDependencies": {
            "sibling": {
                "uri": "package://example.com/pantry/sibling@0.3.0",
                "projectDir": "../sibling-project",
                "remoteDependencies": {
                    "util": { "uri": uri("util", "1.2.3") }
                }
            }
        }
    })
}

fn registry() -> FakeRegistry {
    FakeRegistry::new(&[
        ("toml", "1.0.0", &["util@1.2.4"]),
        ("base", "2.0.0", &["util@1.2.4"]),
        ("util", "1.2.3", &[]),
        ("util", "1.2.4", &[]),
    ])
}

#[tokio::test]
async fn test_resolve_writes_lock_file() {
    let workspace = Workspace::new(graph());
    let http = registry();

    let summary = run_pipeline(&workspace.config(), FakeRegistry::default(), http.clone())
        .await
        .unwrap();

    assert_eq!(summary.project, "app");
    assert_eq!(summary.resolved, 3);
    assert_eq!(summary.downloaded, 3);
    assert_eq!(summary.lock_file, workspace.lock_path());

    let lock = workspace.read_lock();
    let keys: Vec<&str> = lock.resolved_dependencies.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "package://example.com/pantry/base@2",
            "package://example.com/pantry/sibling@0",
            "package://example.com/pantry/toml@1",
            "package://example.com/pantry/util@1",
        ]
    );

    // util@1.2.3 from the sibling loses to util@1.2.4
    let util = &lock.resolved_dependencies["package://example.com/pantry/util@1"];
    assert_eq!(util.uri, "projectpackage://example.com/pantry/util@1.2.4");
    assert_eq!(util.checksums.as_ref().unwrap()["sha256"], "util-1.2.4-sha");
    assert!(workspace.cached("util", "1.2.4"));
    assert!(!workspace.cached("util", "1.2.3"));

    let sibling = &lock.resolved_dependencies["package://example.com/pantry/sibling@0"];
    assert_eq!(sibling.dependency_type, DependencyType::Local);
    assert_eq!(sibling.path.as_deref(), Some("../sibling-project"));
}

#[tokio::test]
async fn test_diamond_fetches_each_package_once() {
    let workspace = Workspace::new(graph());
    let http = registry();

    run_pipeline(&workspace.config(), FakeRegistry::default(), http.clone())
        .await
        .unwrap();

    // toml, base, util@1.2.4 (shared), util@1.2.3
    assert_eq!(http.metadata_calls(), 4);
}

#[tokio::test]
async fn test_second_run_is_offline_and_identical() {
    let workspace = Workspace::new(graph());
    let http = registry();

    run_pipeline(&workspace.config(), FakeRegistry::default(), http.clone())
        .await
        .unwrap();
    let first = fs::read(workspace.lock_path()).unwrap();
    let metadata_calls = http.metadata_calls();
    let archive_calls = http.archive_calls();

    let summary = run_pipeline(&workspace.config(), FakeRegistry::default(), http.clone())
        .await
        .unwrap();
    let second = fs::read(workspace.lock_path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(summary.downloaded, 0);
    // util@1.2.3 loses deduplication but its metadata is still remembered
    assert_eq!(http.metadata_calls(), metadata_calls);
    assert_eq!(http.archive_calls(), archive_calls);
    assert!(!workspace.cached("util", "1.2.3"));
    assert!(workspace
        .root
        .join("cache/metadata/example.com/pantry/util@1.2.3.json")
        .is_file());
}

#[tokio::test]
async fn test_root_dir_rejects_projects_outside_it() {
    let workspace = Workspace::new(graph());
    let mut config = workspace.config();
    config.root_dir = Some(workspace.root.join("app"));

    let err = run_pipeline(&config, FakeRegistry::default(), registry())
        .await
        .unwrap_err();

    assert!(matches!(err, HpklError::ConfigValidation { ref field, .. } if field == "root_dir"));
    assert!(!workspace.lock_path().exists());

    // The sibling project lives under the workspace root
    config.root_dir = Some(workspace.root.clone());
    run_pipeline(&config, FakeRegistry::default(), registry())
        .await
        .unwrap();
    assert!(workspace.lock_path().exists());
}

#[test]
fn test_resolve_dirs_are_taken_from_current_dir() {
    let workspace = Workspace::new(graph());
    let mut config = workspace.config();
    config.working_dir = workspace.root.join("elsewhere");

    let target = config.for_working_dir(Utf8Path::new("app"));
    assert_eq!(target.working_dir, workspace.root.join("app"));
    assert_eq!(target.lock_file_path(), workspace.lock_path());
}

#[tokio::test]
async fn test_failure_leaves_existing_lock_untouched() {
    let workspace = Workspace::new(serde_json::json!({
        "remoteDependencies": {
            "toml": { "uri": uri("toml", "1.0.0") },
            "ghost": { "uri": uri("ghost", "9.9.9") }
        }
    }));
    fs::write(workspace.lock_path(), "previous").unwrap();

    let err = run_pipeline(&workspace.config(), FakeRegistry::default(), registry())
        .await
        .unwrap_err();

    assert!(matches!(err, HpklError::Dependency { ref name, .. } if name == "ghost"));
    assert_eq!(fs::read_to_string(workspace.lock_path()).unwrap(), "previous");
}

#[tokio::test]
async fn test_oci_dependencies_use_oci_fetcher() {
    let workspace = Workspace::new(serde_json::json!({
        "remoteDependencies": {
            "base.oci": { "uri": uri("base", "2.0.0") }
        }
    }));
    let oci = FakeRegistry::new(&[("base", "2.0.0", &[])]);
    let http = FakeRegistry::default();

    run_pipeline(&workspace.config(), oci.clone(), http.clone())
        .await
        .unwrap();

    assert_eq!(oci.metadata_calls(), 1);
    assert_eq!(oci.archive_calls(), 1);
    assert_eq!(http.metadata_calls(), 0);
    assert_eq!(http.archive_calls(), 0);
}

#[tokio::test]
async fn test_missing_project_graph() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(temp.path()).unwrap();
    let config = AppConfig {
        cache_dir: root.join("cache"),
        default_cache_dir: root.join("cache"),
        working_dir: root.to_path_buf(),
        current_dir: root.to_path_buf(),
        root_dir: None,
        plain_http: false,
        registry_token: None,
        project_graph: None,
    };

    let err = run_pipeline(&config, FakeRegistry::default(), FakeRegistry::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HpklError::ProjectNotFound { .. }));
    assert!(!root.join("PklProject.deps.json").exists());
}

#[cfg(unix)]
#[test]
fn test_download_package_links_default_cache() {
    let workspace = Workspace::new(graph());
    let config = workspace.config();
    let source = config
        .default_package_cache_dir()
        .join("example.com/pantry/toml@1.0.0");
    fs::create_dir_all(&source).unwrap();

    let ctx = CommandContext {
        config: config.clone(),
        output: crate::output::OutputHandler::plain(),
    };
    download::execute(&[uri("toml", "1.0.0")], &ctx).unwrap();

    let target = config.package_cache_dir().join("example.com/pantry/toml@1.0.0");
    assert_eq!(fs::read_link(&target).unwrap(), source.as_std_path());

    // Running again keeps the existing link
    download::execute(&[uri("toml", "1.0.0")], &ctx).unwrap();
    assert_eq!(fs::read_link(&target).unwrap(), source.as_std_path());
}

#[test]
fn test_version_command() {
    let workspace = Workspace::new(graph());
    let ctx = CommandContext {
        config: workspace.config(),
        output: crate::output::OutputHandler::plain(),
    };

    let result = tokio_test::block_on(dispatch_command(Commands::Version, &ctx));
    assert!(result.is_ok());
}

//! Application settings, layered from the global file, environment and CLI
//!
//! The resulting `AppConfig` is built once at startup and passed by
//! reference to every component that needs it.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use hpkl_core::error::HpklError;
use hpkl_core::utils::absolutize;
use serde::Deserialize;
use tracing::debug;

use crate::project::PROJECT_GRAPH_FILE;
use crate::ConfigResult;

/// Lock file written into the resolving project's directory
pub const LOCK_FILE_NAME: &str = "PklProject.deps.json";

/// Cache subdirectory holding downloaded packages
pub const PACKAGE_CACHE_DIR: &str = "package-2";

/// Cache subdirectory holding every fetched metadata document
pub const METADATA_CACHE_DIR: &str = "metadata";

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Cache directory used for this run
    pub cache_dir: Utf8PathBuf,
    /// Cache directory the evaluator reads by default (`~/.pkl/cache`)
    pub default_cache_dir: Utf8PathBuf,
    /// Project directory being resolved
    pub working_dir: Utf8PathBuf,
    /// Directory the process was started in
    pub current_dir: Utf8PathBuf,
    /// Every project directory in the graph must live under this directory
    pub root_dir: Option<Utf8PathBuf>,
    /// Talk plain HTTP to registries and metadata servers
    pub plain_http: bool,
    /// Bearer token for the OCI registry
    pub registry_token: Option<String>,
    /// Explicit project graph document
    pub project_graph: Option<Utf8PathBuf>,
}

impl AppConfig {
    /// Directory holding downloaded packages for this run
    pub fn package_cache_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join(PACKAGE_CACHE_DIR)
    }

    /// Directory holding fetched metadata documents for this run
    pub fn metadata_cache_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join(METADATA_CACHE_DIR)
    }

    /// Package directory inside the default cache
    pub fn default_package_cache_dir(&self) -> Utf8PathBuf {
        self.default_cache_dir.join(PACKAGE_CACHE_DIR)
    }

    /// Where the lock file for the working directory is written
    pub fn lock_file_path(&self) -> Utf8PathBuf {
        self.working_dir.join(LOCK_FILE_NAME)
    }

    /// Project graph document for the working directory
    pub fn project_graph_path(&self) -> Utf8PathBuf {
        match &self.project_graph {
            Some(path) => absolutize(&self.working_dir, path),
            None => self.working_dir.join(PROJECT_GRAPH_FILE),
        }
    }

    /// Same configuration pointed at another project directory
    ///
    /// Relative directories are taken from the process's current directory,
    /// not from `--working-dir`.
    pub fn for_working_dir(&self, dir: &Utf8Path) -> Self {
        Self {
            working_dir: absolutize(&self.current_dir, dir),
            ..self.clone()
        }
    }
}

/// Global settings file (`~/.hpkl/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub cache_dir: Option<String>,
    pub plain_http: Option<bool>,
    pub registry_token: Option<String>,
}

impl SettingsFile {
    /// Parse settings from TOML text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| HpklError::ConfigValidation {
            field: "config.toml".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Command line overrides (highest priority)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cache_dir: Option<Utf8PathBuf>,
    pub working_dir: Option<Utf8PathBuf>,
    pub root_dir: Option<Utf8PathBuf>,
    pub plain_http: bool,
    pub project_graph: Option<Utf8PathBuf>,
}

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Home directory
    home: Utf8PathBuf,
    /// Current working directory
    cwd: Utf8PathBuf,
    /// `HPKL_*` environment variables
    env: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a loader for explicit home and current directories
    pub fn new(home: Utf8PathBuf, cwd: Utf8PathBuf) -> Self {
        Self {
            home,
            cwd,
            env: HashMap::new(),
        }
    }

    /// Create a loader from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| HpklError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;
        let home = Utf8PathBuf::try_from(home).map_err(|e| HpklError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: format!("Invalid home directory path: {}", e),
        })?;

        let cwd = std::env::current_dir()
            .map_err(|e| HpklError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| HpklError::ConfigValidation {
            field: "working_dir".to_string(),
            reason: format!("Invalid current directory path: {}", e),
        })?;

        let env = std::env::vars().filter(|(key, _)| key.starts_with("HPKL_")).collect();

        Ok(Self { home, cwd, env })
    }

    /// Replace the environment overrides
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Path of the global settings file
    pub fn settings_path(&self) -> Utf8PathBuf {
        self.home.join(".hpkl").join("config.toml")
    }

    /// Load the global settings file if present
    pub fn load_settings_file(&self) -> ConfigResult<SettingsFile> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(SettingsFile::default());
        }

        debug!(path = %path, "Loading settings");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| HpklError::io(format!("Failed to read {}", path), e))?;
        SettingsFile::parse(&content).map_err(|e| match e {
            HpklError::ConfigValidation { field, reason } => HpklError::ConfigValidation {
                field,
                reason: format!("In file {}: {}", path, reason),
            },
            other => other,
        })
    }

    /// Build the application configuration
    pub fn load(&self, overrides: ConfigOverrides) -> ConfigResult<AppConfig> {
        let settings = self.load_settings_file()?;

        let default_cache_dir = self.home.join(".pkl").join("cache");
        let mut config = AppConfig {
            cache_dir: default_cache_dir.clone(),
            default_cache_dir,
            working_dir: self.cwd.clone(),
            current_dir: self.cwd.clone(),
            root_dir: None,
            plain_http: false,
            registry_token: None,
            project_graph: None,
        };

        // Global file
        if let Some(cache_dir) = settings.cache_dir {
            config.cache_dir = self.expand(&cache_dir);
        }
        if let Some(plain_http) = settings.plain_http {
            config.plain_http = plain_http;
        }
        config.registry_token = settings.registry_token;

        // Environment
        if let Some(cache_dir) = self.env.get("HPKL_CACHE_DIR") {
            config.cache_dir = self.expand(cache_dir);
        }
        if let Some(value) = self.env.get("HPKL_PLAIN_HTTP") {
            config.plain_http = parse_flag("HPKL_PLAIN_HTTP", value)?;
        }
        if let Some(token) = self.env.get("HPKL_REGISTRY_TOKEN") {
            config.registry_token = Some(token.clone());
        }

        // Command line
        if let Some(cache_dir) = overrides.cache_dir {
            config.cache_dir = absolutize(&self.cwd, &cache_dir);
        }
        if let Some(working_dir) = overrides.working_dir {
            config.working_dir = absolutize(&self.cwd, &working_dir);
        }
        config.root_dir = overrides.root_dir.map(|dir| absolutize(&self.cwd, &dir));
        config.plain_http |= overrides.plain_http;
        config.project_graph = overrides.project_graph.map(|path| absolutize(&self.cwd, &path));

        Ok(config)
    }

    /// Expand `~/` and make the path absolute
    fn expand(&self, raw: &str) -> Utf8PathBuf {
        match raw.strip_prefix("~/") {
            Some(rest) => self.home.join(rest),
            None => absolutize(&self.cwd, Utf8Path::new(raw)),
        }
    }
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(HpklError::ConfigValidation {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

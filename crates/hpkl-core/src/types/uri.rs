//! Structured package URIs.
//!
//! A package URI has the shape `scheme://host[:port]/path/name@version`. The
//! version always lives in the last path segment. Lock-file keys, OCI
//! references and cache paths are all derived from the typed fields here.

use camino::Utf8PathBuf;
use semver::Version;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{HpklError, HpklResult};

/// Scheme used for resolved lock-file references
pub const PROJECT_PACKAGE_SCHEME: &str = "projectpackage";

/// A parsed `scheme://host/path@version` package URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageUri {
    scheme: String,
    /// Host with optional port
    authority: String,
    /// Path starting with `/`, without the `@version` suffix
    path: String,
    version: Version,
}

impl PackageUri {
    /// Parse a package URI string
    pub fn parse(input: &str) -> HpklResult<Self> {
        let invalid = |reason: &str| HpklError::UriParse {
            uri: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let (path, version) = url
            .path()
            .rsplit_once('@')
            .ok_or_else(|| invalid("missing @version suffix"))?;
        if version.contains('/') {
            return Err(invalid("version must be part of the last path segment"));
        }
        if path.len() <= 1 || path.ends_with('/') {
            return Err(invalid("missing package name"));
        }

        let version = Version::parse(version).map_err(|source| HpklError::VersionParse {
            version: version.to_string(),
            source,
        })?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
            path: path.to_string(),
            version,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Last path segment, without the version
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Package identity: scheme, host and path, ignoring the version
    pub fn identity(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.path)
    }

    /// Package identity plus major version, e.g. `package://host/pkg@1`
    ///
    /// Only one resolved entry can occupy a given major-version slot in the
    /// lock file.
    pub fn major_identity(&self) -> String {
        format!("{}@{}", self.identity(), self.version.major)
    }

    /// Same URI with another scheme
    pub fn with_scheme(&self, scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            ..self.clone()
        }
    }

    /// The identity used for lock-file `uri` values
    pub fn to_project_package(&self) -> Self {
        self.with_scheme(PROJECT_PACKAGE_SCHEME)
    }

    /// OCI reference `host/path:tag`
    ///
    /// Tags cannot carry `+`, so build metadata separators become `_`.
    pub fn to_oci_reference(&self) -> String {
        let tag = self.version.to_string().replace('+', "_");
        format!("{}{}:{}", self.authority, self.path, tag)
    }

    /// Repository part of the OCI reference, without host and tag
    pub fn oci_repository(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// Relative content cache directory `host/path@version`
    pub fn cache_relative_path(&self) -> Utf8PathBuf {
        let mut path = Utf8PathBuf::from(&self.authority);
        let versioned = format!("{}@{}", self.path.trim_start_matches('/'), self.version);
        for segment in versioned.split('/') {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for PackageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}@{}", self.scheme, self.authority, self.path, self.version)
    }
}

impl FromStr for PackageUri {
    type Err = HpklError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

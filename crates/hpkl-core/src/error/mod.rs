//! Error types and result aliases for hpkl operations.
//!
//! Every step of the resolve pipeline is fail-fast, so a single error type
//! carries transport, parse, filesystem and registry failures up to the CLI.

use thiserror::Error;

/// Unified error type for all hpkl operations
#[derive(Error, Debug)]
pub enum HpklError {
    // Input errors
    #[error("Invalid package URI '{uri}': {reason}")]
    UriParse { uri: String, reason: String },

    #[error("Invalid version '{version}'")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Failed to parse metadata from {uri}: {source}")]
    MetadataParse {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("PklProject not found in the working directory {dir}")]
    ProjectNotFound { dir: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Transport errors
    #[error("Package '{uri}' not found")]
    PackageNotFound { uri: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    Registry { message: String },

    // Resolution errors
    #[error("Failed to resolve dependency '{name}': {source}")]
    Dependency {
        name: String,
        #[source]
        source: Box<HpklError>,
    },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for hpkl operations
pub type HpklResult<T> = Result<T, HpklError>;

impl HpklError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Attach the name of the dependency being processed
    pub fn for_dependency(self, name: &str) -> Self {
        Self::Dependency {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping dependency-name wrappers
    pub fn root_cause(&self) -> &HpklError {
        match self {
            HpklError::Dependency { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.root_cause() {
            HpklError::PackageNotFound { .. } => {
                Some("Check the package URI and version in your PklProject")
            },
            HpklError::Network { .. } => {
                Some("Check your network connection, or pass --plain-http for a local registry")
            },
            HpklError::ProjectNotFound { .. } => {
                Some("Run the command from a project directory or pass --working-dir")
            },
            HpklError::UriParse { .. } | HpklError::VersionParse { .. } => {
                Some("Package URIs look like package://host/path/name@1.2.3")
            },
            _ => None,
        }
    }
}

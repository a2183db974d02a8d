//! Core data types for hpkl package resolution.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Dependency declarations and their transport kind
//! - Package metadata as served by registries
//! - Structured package URIs

pub mod dependency;
pub mod metadata;
pub mod uri;

// Re-export all public types
pub use dependency::{Dependency, DependencyEntry, RemoteKind, OCI_NAME_SUFFIX};
pub use metadata::{Checksums, Metadata, ResolvedSet};
pub use uri::{PackageUri, PROJECT_PACKAGE_SCHEME};

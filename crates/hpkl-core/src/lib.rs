//! # hpkl-core
//!
//! Core types and utilities shared across all hpkl crates.
//!
//! This crate provides:
//! - `Dependency` and `RemoteKind`, the declared edges of a project graph
//! - `Metadata`, the resolved descriptor of one package version
//! - `PackageUri`, a structured `scheme://host/path@version` parser
//! - `HpklError` for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Dependency, Metadata, PackageUri)
//! - `error`: Error types and result aliases
//! - `utils`: Path helpers used by the cache and the lock file

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{HpklError, HpklResult};
pub use types::{
    Checksums, Dependency, DependencyEntry, Metadata, PackageUri, RemoteKind, ResolvedSet,
};

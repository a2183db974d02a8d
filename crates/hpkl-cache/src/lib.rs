//! Package content cache for hpkl
//!
//! Downloaded packages live under `<cache>/package-2/<host>/<path@version>`
//! as a metadata document and the raw archive. The presence of that
//! directory is the only signal that a package is already downloaded.
//! Every metadata document fetched during resolution is also kept under
//! `<cache>/metadata/<host>/<path@version>.json`, downloaded or not.

pub mod link;
pub mod store;

pub use link::{mirror_packages, LinkOutcome};
pub use store::{CacheFirst, ContentCache, Downloader};

use hpkl_core::error::HpklError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, HpklError>;

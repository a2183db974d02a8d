//! Dependency resolution for hpkl
//!
//! Expands declared remote dependencies into the flat set of every package
//! version reachable from them, then collapses that set to one entry per
//! package and major version.

pub mod dedup;
pub mod resolve;

pub use dedup::deduplicate;
pub use resolve::Resolver;

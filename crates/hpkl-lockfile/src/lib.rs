//! Lock file generation for hpkl
//!
//! Turns a deduplicated resolved set and the project graph into
//! `PklProject.deps.json`.

pub mod builder;
pub mod model;
pub mod writer;

pub use builder::LockFileBuilder;
pub use model::{DependencyType, LockFile, ResolvedDependency, LOCK_SCHEMA_VERSION};
pub use writer::write_lock_file;

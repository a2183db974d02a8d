//! Configuration and project graph input for hpkl
//!
//! This crate layers the application settings (global file, environment,
//! command line) and loads the project graph handed over by the evaluator.

pub mod project;
pub mod settings;

// Re-export main types
pub use project::{ProjectNode, PROJECT_GRAPH_FILE};
pub use settings::{AppConfig, ConfigLoader, ConfigOverrides, SettingsFile, LOCK_FILE_NAME};

use hpkl_core::error::HpklError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, HpklError>;

//! Atomic lock file persistence

use camino::Utf8Path;
use hpkl_core::error::HpklError;
use hpkl_core::HpklResult;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

use crate::model::LockFile;

/// Write `lock` to `path`, replacing any previous file in one rename
///
/// The temporary file is created next to the destination so the rename
/// never crosses filesystems. On error the previous file is untouched.
pub fn write_lock_file(path: &Utf8Path, lock: &LockFile) -> HpklResult<()> {
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let content = lock.to_json().map_err(|e| HpklError::ConfigValidation {
        field: "lock file".to_string(),
        reason: e.to_string(),
    })?;

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| HpklError::io(format!("Failed to create temporary file in {}", dir), e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| HpklError::io(format!("Failed to write lock file for {}", path), e))?;
    file.persist(path)
        .map_err(|e| HpklError::io(format!("Failed to replace {}", path), e.error))?;

    info!(path = %path, entries = lock.resolved_dependencies.len(), "Wrote lock file");
    Ok(())
}

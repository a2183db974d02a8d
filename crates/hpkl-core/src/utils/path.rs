//! Path utilities for project directories.
//!
//! Local dependency paths in the lock file are relative to the resolving
//! project, so they must not depend on the directory the tool was started in.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::{HpklError, HpklResult};

/// Normalize a path by resolving . and .. components lexically
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components: Vec<Utf8Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {},
            Utf8Component::ParentDir => match components.last() {
                Some(Utf8Component::Normal(_)) => {
                    components.pop();
                },
                // `/..` is `/`
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {},
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Make a path absolute against `base` and normalize it
pub fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Path of `target` relative to `from`, e.g. `../sibling-project`
///
/// Both paths must be absolute.
pub fn relative_path(from: &Utf8Path, target: &Utf8Path) -> HpklResult<Utf8PathBuf> {
    if !from.is_absolute() || !target.is_absolute() {
        return Err(HpklError::ConfigValidation {
            field: "path".to_string(),
            reason: format!("cannot relativize {} against {}", target, from),
        });
    }

    let from = normalize_path(from);
    let target = normalize_path(target);
    let relative = pathdiff::diff_utf8_paths(&target, &from).ok_or_else(|| {
        HpklError::ConfigValidation {
            field: "path".to_string(),
            reason: format!("no relative path from {} to {}", from, target),
        }
    })?;

    if relative.as_str().is_empty() {
        Ok(Utf8PathBuf::from("."))
    } else {
        Ok(relative)
    }
}

//! Mirror packages from the default cache into a custom cache
//!
//! Each package directory in the custom cache becomes a symlink to the same
//! directory in the default cache.

use camino::{Utf8Path, Utf8PathBuf};
use hpkl_core::error::HpklError;
use hpkl_core::PackageUri;
use std::fs;
use tracing::{debug, info};

use crate::CacheResult;

/// What happened to one package argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked { source: Utf8PathBuf, target: Utf8PathBuf },
    AlreadyPresent { target: Utf8PathBuf },
}

/// Link each `uri[::suffix]` argument from `default_root` into `target_root`
///
/// Both roots are package directories (`<cache>/package-2`). Nothing happens
/// when they are the same directory.
pub fn mirror_packages<S: AsRef<str>>(
    default_root: &Utf8Path,
    target_root: &Utf8Path,
    packages: &[S],
) -> CacheResult<Vec<LinkOutcome>> {
    if default_root == target_root {
        debug!(cache = %target_root, "Target cache is the default cache");
        return Ok(Vec::new());
    }

    packages
        .iter()
        .map(|package| link_package(default_root, target_root, package.as_ref()))
        .collect()
}

fn link_package(default_root: &Utf8Path, target_root: &Utf8Path, argument: &str) -> CacheResult<LinkOutcome> {
    let uri = argument.split("::").next().unwrap_or(argument);
    let relative = PackageUri::parse(uri)?.cache_relative_path();

    let source = default_root.join(&relative);
    let target = target_root.join(&relative);

    if fs::symlink_metadata(&target).is_ok() {
        debug!(target = %target, "Already present");
        return Ok(LinkOutcome::AlreadyPresent { target });
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HpklError::io(format!("Failed to create directory {}", parent), e))?;
    }

    symlink_dir(&source, &target)
        .map_err(|e| HpklError::io(format!("Failed to link {} to {}", target, source), e))?;
    info!(source = %source, target = %target, "Linked");

    Ok(LinkOutcome::Linked { source, target })
}

#[cfg(unix)]
fn symlink_dir(source: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink_dir(source: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(source, target)
}

//! `hpkl download-package` command implementation.
//!
//! Makes packages already present in the default cache visible in the cache
//! selected with `--cache-dir` by symlinking their directories.

use hpkl_cache::{mirror_packages, LinkOutcome};
use hpkl_core::error::HpklResult;

use super::CommandContext;

pub fn execute(packages: &[String], ctx: &CommandContext) -> HpklResult<()> {
    let config = &ctx.config;
    if config.cache_dir == config.default_cache_dir {
        ctx.output.warn("Cache directory is the default cache, nothing to link");
        return Ok(());
    }

    let outcomes = mirror_packages(
        &config.default_package_cache_dir(),
        &config.package_cache_dir(),
        packages,
    )?;

    for outcome in &outcomes {
        match outcome {
            LinkOutcome::Linked { target, .. } => ctx.output.success(&format!("Linked {}", target)),
            LinkOutcome::AlreadyPresent { target } => ctx.output.info(&format!("Already present: {}", target)),
        }
    }

    Ok(())
}

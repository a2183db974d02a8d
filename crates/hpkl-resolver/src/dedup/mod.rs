//! Major-version deduplication
//!
//! Packages sharing scheme, host, path and major version occupy a single
//! slot. The highest semantic version in each slot survives; entries in
//! different major versions never compete.

use std::collections::BTreeMap;

use hpkl_core::{HpklResult, Metadata, ResolvedSet};
use semver::{Prerelease, Version};
use tracing::debug;

/// Precedence ignores build metadata
fn precedence(version: &Version) -> (u64, u64, u64, &Prerelease) {
    (version.major, version.minor, version.patch, &version.pre)
}

/// Collapse a resolved set to one entry per package and major version
///
/// Surviving entries keep their original keys. On a precedence tie the entry
/// whose key sorts first is kept.
pub fn deduplicate(mut resolved: ResolvedSet) -> HpklResult<ResolvedSet> {
    // major identity -> (version, key)
    let mut winners: BTreeMap<String, (Version, String)> = BTreeMap::new();

    for (key, metadata) in &resolved {
        let identity = slot(metadata)?;
        let version = metadata
            .semver()
            .map_err(|e| e.for_dependency(&metadata.name))?;

        match winners.get(&identity) {
            Some((current, current_key)) if precedence(current) >= precedence(&version) => {
                debug!(dropped = %key, kept = %current_key, "Superseded");
            },
            Some((_, current_key)) => {
                debug!(dropped = %current_key, kept = %key, "Superseded");
                winners.insert(identity, (version, key.clone()));
            },
            None => {
                winners.insert(identity, (version, key.clone()));
            },
        }
    }

    let deduplicated: ResolvedSet = winners
        .into_values()
        .filter_map(|(_, key)| resolved.remove_entry(&key))
        .collect();
    Ok(deduplicated)
}

fn slot(metadata: &Metadata) -> HpklResult<String> {
    metadata
        .parsed_uri()
        .map(|uri| uri.major_identity())
        .map_err(|e| e.for_dependency(&metadata.name))
}

use anyhow::{Context, Result};

use crate::vcs::VersionControl;
use crate::version::VersionId;

/// Numbered legacy releases (`r131`).
pub const LEGACY_TAG_PATTERN: &str = "r[0-9][0-9][0-9]";
/// Semantic releases (`v1.9.4`).
pub const SEMVER_TAG_PATTERN: &str = "v[1-9].[0-9].[0-9]";

/// Resolves the versions under test: head first, then legacy tags, then
/// semantic tags, each family in collaborator-reported order.
///
/// No partial catalog is ever returned; any collaborator failure is an error.
pub fn resolve(vcs: &dyn VersionControl, head_label: &str) -> Result<Vec<VersionId>> {
    let mut versions = vec![VersionId::head(head_label)];
    for pattern in [LEGACY_TAG_PATTERN, SEMVER_TAG_PATTERN] {
        let tags = vcs
            .list_tags(pattern)
            .with_context(|| format!("resolve version catalog ({pattern})"))?;
        for tag in tags {
            let v = VersionId::tag(tag);
            if v.as_str() == head_label || versions.contains(&v) {
                tracing::warn!(tag = %v, "skipping duplicate tag");
                continue;
            }
            versions.push(v);
        }
    }
    Ok(versions)
}

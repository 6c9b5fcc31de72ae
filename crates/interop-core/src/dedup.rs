use anyhow::{Context, Result};

use crate::matrix::Artifact;

/// An artifact dropped because an earlier representative has the same bytes.
#[derive(Debug, Clone)]
pub struct Duplicate {
    /// Index into [`Deduplicated::representatives`].
    pub representative: usize,
    pub discarded: Artifact,
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    pub representatives: Vec<Artifact>,
    pub duplicates: Vec<Duplicate>,
}

impl Deduplicated {
    pub fn kept_for(&self, dup: &Duplicate) -> &Artifact {
        &self.representatives[dup.representative]
    }
}

/// Partitions `artifacts` into classes of identical bytes, keeping the first
/// member of each class in input order.
///
/// Equality is exact byte comparison, never hash equality. Labels (version,
/// level, bitness) play no part.
pub fn deduplicate(artifacts: Vec<Artifact>) -> Deduplicated {
    let mut out = Deduplicated::default();
    for artifact in artifacts {
        match out
            .representatives
            .iter()
            .position(|rep| rep.bytes == artifact.bytes)
        {
            Some(representative) => out.duplicates.push(Duplicate {
                representative,
                discarded: artifact,
            }),
            None => out.representatives.push(artifact),
        }
    }
    out
}

/// Deletes the files of discarded duplicates. Representatives are untouched.
pub fn remove_discarded(dedup: &Deduplicated) -> Result<()> {
    for dup in &dedup.duplicates {
        let path = &dup.discarded.path;
        if path == &dedup.kept_for(dup).path {
            continue;
        }
        std::fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::codec::CodecRunner;
use crate::layout::ScratchLayout;
use crate::provision::ExecutableSet;
use crate::util::sha256_hex;
use crate::version::{Bitness, Level, VersionId};

/// Iteration order of the matrix.
///
/// Versions come from the catalog; for each version every bitness is visited,
/// and for each bitness every level. Deduplication keeps the first artifact of
/// each byte-identical class, so this order decides which one survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub bitnesses: Vec<Bitness>,
    pub levels: Vec<Level>,
}

impl Default for Enumeration {
    fn default() -> Self {
        Self {
            bitnesses: Bitness::ALL.to_vec(),
            levels: Level::ALL.to_vec(),
        }
    }
}

/// One compressed output of the reference input.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub version: VersionId,
    pub bitness: Bitness,
    pub level: Level,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Reads the bytes an external compressor wrote to `path`.
    pub fn load(version: VersionId, bitness: Bitness, level: Level, path: PathBuf) -> Result<Self> {
        let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self {
            version,
            bitness,
            level,
            size: bytes.len() as u64,
            sha256: sha256_hex(&bytes),
            path,
            bytes,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Compresses `reference` with every (version, bitness, level) in order.
///
/// Every artifact comes from its own external invocation; nothing is reused
/// between cells.
pub fn build_matrix(
    codec: &CodecRunner,
    layout: &ScratchLayout,
    executables: &ExecutableSet,
    versions: &[VersionId],
    order: &Enumeration,
    reference: &Path,
) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::with_capacity(versions.len() * order.bitnesses.len() * order.levels.len());
    for version in versions {
        for &bitness in &order.bitnesses {
            let exe = executables
                .get(version, bitness)
                .ok_or_else(|| anyhow!("no executable provisioned for {version} {bitness}"))?;
            for &level in &order.levels {
                let out = layout.artifact_path(version, bitness, level);
                codec.compress(exe, level, reference, &out)?;
                artifacts.push(Artifact::load(version.clone(), bitness, level, out)?);
            }
        }
    }
    Ok(artifacts)
}

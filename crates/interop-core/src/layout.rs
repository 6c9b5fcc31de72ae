use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::HarnessConfig;
use crate::version::{Bitness, Level, VersionId};

/// Filesystem layout of a run. All writes stay under `scratch_dir`.
#[derive(Debug, Clone)]
pub struct ScratchLayout {
    base_dir: PathBuf,
    scratch_dir: PathBuf,
    clone_dir: PathBuf,
    head_programs_dir: PathBuf,
    programs_rel: PathBuf,
    reference_name: String,
    tool: String,
    artifact_ext: String,
    decoded_ext: String,
}

impl ScratchLayout {
    pub fn new(cfg: &HarnessConfig) -> Self {
        let scratch_dir = cfg.base_dir.join(&cfg.scratch_rel);
        Self {
            base_dir: cfg.base_dir.clone(),
            clone_dir: scratch_dir.join(&cfg.clone_name),
            head_programs_dir: cfg.base_dir.join(&cfg.programs_rel),
            scratch_dir,
            programs_rel: cfg.programs_rel.clone(),
            reference_name: cfg.reference_name.clone(),
            tool: cfg.codec.tool.clone(),
            artifact_ext: cfg.codec.artifact_ext.clone(),
            decoded_ext: cfg.codec.decoded_ext.clone(),
        }
    }

    /// Creates the scratch directory if absent. Existing contents persist.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.scratch_dir)
            .with_context(|| format!("create_dir_all {}", self.scratch_dir.display()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn clone_dir(&self) -> &Path {
        &self.clone_dir
    }

    pub fn reference_path(&self) -> PathBuf {
        self.scratch_dir.join(&self.reference_name)
    }

    /// Where a version's sources are materialized.
    pub fn checkout_dir(&self, version: &VersionId) -> PathBuf {
        self.scratch_dir.join(version.as_str())
    }

    /// Directory the build collaborator runs in for `version`.
    pub fn build_dir(&self, version: &VersionId) -> PathBuf {
        if version.is_head() {
            self.head_programs_dir.clone()
        } else {
            self.checkout_dir(version).join(&self.programs_rel)
        }
    }

    pub fn build_target(&self, bitness: Bitness) -> String {
        bitness.target(&self.tool)
    }

    /// Cache path of the executable for (version, bitness).
    pub fn executable_path(&self, version: &VersionId, bitness: Bitness) -> PathBuf {
        self.scratch_dir
            .join(format!("{}.{}", self.build_target(bitness), version))
    }

    pub fn artifact_path(&self, version: &VersionId, bitness: Bitness, level: Level) -> PathBuf {
        self.scratch_dir.join(format!(
            "{}_{}_{}_{}.{}",
            self.reference_name,
            level.file_tag(),
            bitness.file_tag(),
            version,
            self.artifact_ext
        ))
    }

    /// Output path for decoding `artifact` with (version, bitness).
    pub fn decoded_path(&self, artifact: &Path, version: &VersionId, bitness: Bitness) -> PathBuf {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.scratch_dir.join(format!(
            "{name}_d{}_{}.{}",
            bitness.file_tag(),
            version,
            self.decoded_ext
        ))
    }

    /// Removes artifacts and decoded outputs left behind by a previous run.
    pub fn clear_stale_outputs(&self) -> Result<usize> {
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.scratch_dir)
            .with_context(|| format!("read_dir {}", self.scratch_dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext == self.artifact_ext || ext == self.decoded_ext {
                std::fs::remove_file(&path)
                    .with_context(|| format!("remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

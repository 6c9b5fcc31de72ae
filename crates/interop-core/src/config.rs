use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::version::Level;

pub const DEFAULT_REPO_URL: &str = "https://github.com/lz4/lz4.git";
pub const DEFAULT_HEAD_LABEL: &str = "v999";

/// Every tunable of a harness run.
///
/// Defaults describe the lz4 tree; environment variables override the few
/// values that differ between machines.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    /// Root of the working tree under test.
    pub base_dir: PathBuf,
    pub repo_url: String,
    /// Scratch directory, relative to `base_dir`.
    pub scratch_rel: PathBuf,
    /// Directory name of the full clone inside the scratch directory.
    pub clone_name: String,
    /// Directory holding the build entry point, relative to a source tree.
    pub programs_rel: PathBuf,
    /// Reference input, relative to `base_dir`.
    pub reference_src: PathBuf,
    /// Name of the private copy of the reference input.
    pub reference_name: String,
    pub head_label: String,
    pub git: String,
    pub make: String,
    pub codec: CodecConvention,
}

/// How the executables under test are named and invoked.
#[derive(Debug, Clone, Serialize)]
pub struct CodecConvention {
    /// Native build target; the 32-bit target appends `32`.
    pub tool: String,
    pub artifact_ext: String,
    pub decoded_ext: String,
    pub fast_flags: String,
    pub max_flags: String,
    pub decompress_flags: String,
}

impl Default for CodecConvention {
    fn default() -> Self {
        Self {
            tool: "lz4c".to_string(),
            artifact_ext: "lz4".to_string(),
            decoded_ext: "dec".to_string(),
            fast_flags: "-1fz".to_string(),
            max_flags: "-9fz".to_string(),
            decompress_flags: "-df".to_string(),
        }
    }
}

impl CodecConvention {
    pub fn level_flags(&self, level: Level) -> &str {
        match level {
            Level::Fast => &self.fast_flags,
            Level::Max => &self.max_flags,
        }
    }
}

impl HarnessConfig {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            repo_url: DEFAULT_REPO_URL.to_string(),
            scratch_rel: PathBuf::from("tests/versionsTest"),
            clone_name: "lz4".to_string(),
            programs_rel: PathBuf::from("programs"),
            reference_src: PathBuf::from("README.md"),
            reference_name: "test_dat".to_string(),
            head_label: DEFAULT_HEAD_LABEL.to_string(),
            git: "git".to_string(),
            make: "make".to_string(),
            codec: CodecConvention::default(),
        }
    }

    /// Resolves configuration for a run started from `cwd`.
    ///
    /// The harness lives in the tree's `tests/` directory, so the default base
    /// is the parent of the working directory.
    pub fn from_env(cwd: &Path) -> Result<Self> {
        Self::from_lookup(cwd, |key| {
            std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
        })
    }

    pub fn from_lookup(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_dir = match non_empty("INTEROP_ROOT") {
            Some(root) => PathBuf::from(root),
            None => cwd
                .parent()
                .with_context(|| format!("{} has no parent directory", cwd.display()))?
                .to_path_buf(),
        };

        let mut cfg = Self::with_base_dir(base_dir);
        if let Some(v) = non_empty("INTEROP_REPO_URL") {
            cfg.repo_url = v;
        }
        if let Some(v) = non_empty("INTEROP_REFERENCE") {
            cfg.reference_src = PathBuf::from(v);
        }
        if let Some(v) = non_empty("INTEROP_GIT") {
            cfg.git = v;
        }
        if let Some(v) = non_empty("INTEROP_MAKE") {
            cfg.make = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.head_label.is_empty() {
            bail!("head label must be non-empty");
        }
        if self.head_label.contains('/') || self.head_label.contains("..") {
            bail!("invalid head label: {}", self.head_label);
        }
        if self.codec.tool.is_empty() {
            bail!("codec tool name must be non-empty");
        }
        if self.codec.artifact_ext == self.codec.decoded_ext {
            bail!(
                "artifact and decoded extensions must differ (both {})",
                self.codec.artifact_ext
            );
        }
        Ok(())
    }
}

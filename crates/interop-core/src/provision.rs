use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::build::{BuildSystem, CLEAN_TARGET};
use crate::codec::CodecRunner;
use crate::error::InfraError;
use crate::layout::ScratchLayout;
use crate::vcs::VersionControl;
use crate::version::{Bitness, Level, VersionId};

/// A runnable executable for one (version, bitness) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableHandle {
    pub version: VersionId,
    pub bitness: Bitness,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    Built,
    Reused,
}

#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
    #[serde(flatten)]
    pub handle: ExecutableHandle,
    pub status: ProvisionStatus,
}

/// Whether cached executables of released versions may be reused.
///
/// The head version is rebuilt under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    ReuseExisting,
    AlwaysRebuild,
}

/// Handles for every provisioned pair, in provisioning order.
#[derive(Debug, Clone, Default)]
pub struct ExecutableSet {
    handles: Vec<ExecutableHandle>,
}

impl ExecutableSet {
    pub fn get(&self, version: &VersionId, bitness: Bitness) -> Option<&ExecutableHandle> {
        self.handles
            .iter()
            .find(|h| &h.version == version && h.bitness == bitness)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutableHandle> {
        self.handles.iter()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl FromIterator<ExecutableHandle> for ExecutableSet {
    fn from_iter<I: IntoIterator<Item = ExecutableHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

/// Builds or reuses one executable per (version, bitness), keyed on disk by
/// both.
pub struct Provisioner<'a> {
    layout: &'a ScratchLayout,
    vcs: &'a dyn VersionControl,
    builder: &'a dyn BuildSystem,
    build_env: BTreeMap<String, String>,
    policy: CachePolicy,
    materialized: HashSet<VersionId>,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        layout: &'a ScratchLayout,
        vcs: &'a dyn VersionControl,
        builder: &'a dyn BuildSystem,
        build_env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            layout,
            vcs,
            builder,
            build_env,
            policy: CachePolicy::default(),
            materialized: HashSet::new(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn must_rebuild(&self, version: &VersionId, bitness: Bitness) -> bool {
        version.is_head()
            || self.policy == CachePolicy::AlwaysRebuild
            || !self.layout.executable_path(version, bitness).is_file()
    }

    /// Provides the executable for a single pair.
    pub fn provide(&mut self, version: &VersionId, bitness: Bitness) -> Result<Provisioned> {
        let rebuild = self.must_rebuild(version, bitness);
        self.provide_pair(version, bitness, rebuild)
    }

    /// Provides every pair of `version`. A released version missing any of its
    /// executables is rebuilt for all bitnesses.
    pub fn provide_version(
        &mut self,
        version: &VersionId,
        bitnesses: &[Bitness],
    ) -> Result<Vec<Provisioned>> {
        let rebuild = bitnesses.iter().any(|&b| self.must_rebuild(version, b));
        bitnesses
            .iter()
            .map(|&b| self.provide_pair(version, b, rebuild))
            .collect()
    }

    /// Provides all pairs in catalog order, stopping at the first failure.
    pub fn provide_all(
        &mut self,
        versions: &[VersionId],
        bitnesses: &[Bitness],
        mut on_ready: impl FnMut(&Provisioned),
    ) -> Result<Vec<Provisioned>> {
        let mut out = Vec::with_capacity(versions.len() * bitnesses.len());
        for version in versions {
            tracing::info!(version = %version, "provision");
            for p in self.provide_version(version, bitnesses)? {
                on_ready(&p);
                out.push(p);
            }
        }
        Ok(out)
    }

    fn provide_pair(
        &mut self,
        version: &VersionId,
        bitness: Bitness,
        rebuild: bool,
    ) -> Result<Provisioned> {
        let path = self.layout.executable_path(version, bitness);
        let status = if rebuild {
            self.build_into(version, bitness, &path)?;
            ProvisionStatus::Built
        } else {
            tracing::debug!(path = %path.display(), "reuse cached executable");
            ProvisionStatus::Reused
        };
        Ok(Provisioned {
            handle: ExecutableHandle {
                version: version.clone(),
                bitness,
                path,
            },
            status,
        })
    }

    fn build_into(&mut self, version: &VersionId, bitness: Bitness, dest: &Path) -> Result<()> {
        if !version.is_head() && !self.materialized.contains(version) {
            let dir = self.layout.checkout_dir(version);
            self.vcs.checkout(version.as_str(), &dir)?;
            self.materialized.insert(version.clone());
        }

        let dir = self.layout.build_dir(version);
        let target = self.layout.build_target(bitness);
        self.builder
            .build(&[CLEAN_TARGET, target.as_str()], &dir, &self.build_env)
            .with_context(|| format!("build {target} for {version}"))?;

        let built = dir.join(&target);
        if !built.is_file() {
            return Err(InfraError::MissingOutput { target, dir }.into());
        }
        install_executable(&built, dest)
    }
}

/// Copies a freshly built executable into the cache, replacing any previous
/// copy atomically.
fn install_executable(src: &Path, dest: &Path) -> Result<()> {
    let name = dest
        .file_name()
        .with_context(|| format!("cache path has no file name: {}", dest.display()))?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = dest.with_file_name(tmp_name);
    std::fs::copy(src, &tmp)
        .with_context(|| format!("copy {} -> {}", src.display(), tmp.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        let perm = std::fs::Permissions::from_mode(0o755);
        std::fs::set_permissions(&tmp, perm).with_context(|| format!("chmod {}", tmp.display()))?;
    }
    std::fs::rename(&tmp, dest)
        .with_context(|| format!("rename {} -> {}", tmp.display(), dest.display()))?;
    Ok(())
}

/// Compresses a small known input with `exe` and decodes it again.
///
/// Returns whether the bytes survived; a non-zero exit from either step is an
/// error.
pub fn round_trip_smoke(codec: &CodecRunner, exe: &ExecutableHandle, work_dir: &Path) -> Result<bool> {
    const SMOKE_INPUT: &[u8] = b"interop smoke: 0123456789 abcdefghij 0123456789 abcdefghij\n";

    let stem = format!("smoke_{}_{}", exe.bitness.file_tag(), exe.version);
    let input = work_dir.join(&stem);
    let packed = work_dir.join(format!("{stem}.packed"));
    let unpacked = work_dir.join(format!("{stem}.unpacked"));

    std::fs::write(&input, SMOKE_INPUT).with_context(|| format!("write {}", input.display()))?;
    codec.compress(exe, Level::Fast, &input, &packed)?;
    codec.decompress(exe, &packed, &unpacked)?;
    let got = std::fs::read(&unpacked).with_context(|| format!("read {}", unpacked.display()))?;

    for p in [&input, &packed, &unpacked] {
        std::fs::remove_file(p).with_context(|| format!("remove {}", p.display()))?;
    }
    Ok(got == SMOKE_INPUT)
}

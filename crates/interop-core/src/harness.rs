use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use interop_contracts::INTEROP_REPORT_FILE_NAME;

use crate::build::BuildSystem;
use crate::catalog;
use crate::codec::CodecRunner;
use crate::config::HarnessConfig;
use crate::dedup::{deduplicate, remove_discarded, Deduplicated};
use crate::layout::ScratchLayout;
use crate::matrix::{build_matrix, Artifact, Enumeration};
use crate::provision::{CachePolicy, ExecutableSet, Provisioned, Provisioner};
use crate::report::{Reporter, RunReport};
use crate::vcs::VersionControl;
use crate::verify::{Verification, Verifier};
use crate::version::VersionId;

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub versions: Vec<VersionId>,
    pub executables: Vec<Provisioned>,
    pub artifacts: Vec<Artifact>,
    pub dedup: Deduplicated,
    pub verification: Verification,
    pub report_path: PathBuf,
}

impl RunOutcome {
    /// True when every decode reproduced the reference input.
    pub fn ok(&self) -> bool {
        self.verification.ok()
    }
}

/// Runs catalog, provisioning, matrix, dedup and verification in sequence.
///
/// Returns `Err` for infrastructure failures only. Compatibility mismatches
/// are part of a successful `RunOutcome`.
pub struct Harness<'a> {
    config: &'a HarnessConfig,
    layout: ScratchLayout,
    vcs: &'a dyn VersionControl,
    builder: &'a dyn BuildSystem,
    build_env: BTreeMap<String, String>,
    policy: CachePolicy,
    order: Enumeration,
}

impl<'a> Harness<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        vcs: &'a dyn VersionControl,
        builder: &'a dyn BuildSystem,
        build_env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            config,
            layout: ScratchLayout::new(config),
            vcs,
            builder,
            build_env,
            policy: CachePolicy::default(),
            order: Enumeration::default(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_order(mut self, order: Enumeration) -> Self {
        self.order = order;
        self
    }

    pub fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    pub fn run<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<RunOutcome> {
        let layout = &self.layout;
        layout.ensure()?;
        let stale = layout.clear_stale_outputs()?;
        tracing::debug!(removed = stale, "cleared stale outputs");

        if !layout.clone_dir().is_dir() {
            tracing::info!(url = %self.config.repo_url, "clone");
            self.vcs
                .clone_repo(&self.config.repo_url, layout.clone_dir())
                .context("clone upstream repository")?;
        }

        let src = layout.base_dir().join(&self.config.reference_src);
        let reference_path = layout.reference_path();
        std::fs::copy(&src, &reference_path).with_context(|| {
            format!("copy {} -> {}", src.display(), reference_path.display())
        })?;
        let reference = std::fs::read(&reference_path)
            .with_context(|| format!("read {}", reference_path.display()))?;

        let versions = catalog::resolve(self.vcs, &self.config.head_label)?;
        reporter.catalog(&versions)?;

        let mut provisioner =
            Provisioner::new(layout, self.vcs, self.builder, self.build_env.clone())
                .with_policy(self.policy);
        let mut report_err = Ok(());
        let executables =
            provisioner.provide_all(&versions, &self.order.bitnesses, |p| {
                if report_err.is_ok() {
                    report_err = reporter.provisioned(p);
                }
            })?;
        report_err?;
        let set: ExecutableSet = executables.iter().map(|p| p.handle.clone()).collect();

        let codec = CodecRunner::new(self.config.codec.clone());
        tracing::info!("compress reference input");
        let artifacts = build_matrix(&codec, layout, &set, &versions, &self.order, &reference_path)?;
        reporter.inventory(&artifacts)?;

        let dedup = deduplicate(artifacts.clone());
        remove_discarded(&dedup)?;
        reporter.duplicates(&dedup)?;

        tracing::info!(representatives = dedup.representatives.len(), "cross-decompress");
        let verification = Verifier::new(&codec, layout, &set, &self.order.bitnesses).run(
            &dedup.representatives,
            &versions,
            &reference,
            reporter,
        )?;
        reporter.summary(&verification)?;

        let report_path = layout.scratch_dir().join(INTEROP_REPORT_FILE_NAME);
        RunReport::new(
            self.config,
            &versions,
            &executables,
            &artifacts,
            &dedup,
            &verification,
        )
        .write(&report_path)?;

        Ok(RunOutcome {
            versions,
            executables,
            artifacts,
            dedup,
            verification,
            report_path,
        })
    }
}

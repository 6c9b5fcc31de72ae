use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use interop_contracts::INTEROP_REPORT_SCHEMA_VERSION;

use crate::config::HarnessConfig;
use crate::dedup::Deduplicated;
use crate::matrix::Artifact;
use crate::provision::{ExecutableHandle, ProvisionStatus, Provisioned};
use crate::verify::{Verification, VerifyObserver};
use crate::version::VersionId;

/// Human-readable progress. Output only: it never influences the run.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn catalog(&mut self, versions: &[VersionId]) -> Result<()> {
        writeln!(self.out, "Retrieve all release tags :")?;
        let tags: Vec<&str> = versions.iter().map(VersionId::as_str).collect();
        writeln!(self.out, "{}", tags.join(" "))?;
        Ok(())
    }

    pub fn provisioned(&mut self, p: &Provisioned) -> Result<()> {
        let verb = match p.status {
            ProvisionStatus::Built => "built",
            ProvisionStatus::Reused => "reused",
        };
        writeln!(
            self.out,
            "{} ({}): {verb} {}",
            p.handle.version,
            p.handle.bitness,
            p.handle.path.display()
        )?;
        Ok(())
    }

    pub fn inventory(&mut self, artifacts: &[Artifact]) -> Result<()> {
        writeln!(self.out, "Full list of compressed files")?;
        for a in artifacts {
            writeln!(self.out, "{} : {}, {}", a.file_name(), a.size, a.sha256)?;
        }
        Ok(())
    }

    pub fn duplicates(&mut self, dedup: &Deduplicated) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Duplicated files")?;
        for dup in &dedup.duplicates {
            writeln!(
                self.out,
                "{} == {}",
                dedup.kept_for(dup).file_name(),
                dup.discarded.file_name()
            )?;
        }
        writeln!(self.out, "Enumerate only different compressed files")?;
        for a in &dedup.representatives {
            writeln!(self.out, "{} : {}, {}", a.file_name(), a.size, a.sha256)?;
        }
        writeln!(self.out, "Decompression tests and verifications")?;
        Ok(())
    }

    pub fn summary(&mut self, verification: &Verification) -> Result<()> {
        for m in &verification.mismatches {
            writeln!(
                self.out,
                "MISMATCH : {} ({} {} {}) decoded by {} ({}) -> {} ({} bytes, expected {})",
                m.artifact.display(),
                m.producer_version,
                m.producer_bitness,
                m.producer_level,
                m.decoder_version,
                m.decoder_bitness,
                m.output.display(),
                m.actual_size,
                m.expected_size
            )?;
            if m.output_missing {
                writeln!(self.out, "           decoder exited 0 without writing output")?;
            }
        }
        if verification.ok() {
            writeln!(self.out, "OK : {} decodes matched", verification.decoded)?;
        } else {
            writeln!(
                self.out,
                "ERROR : {} of {} decodes mismatched",
                verification.mismatches.len(),
                verification.decoded
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> VerifyObserver for Reporter<W> {
    fn artifact_started(&mut self, artifact: &Artifact) -> Result<()> {
        writeln!(self.out, "{}", artifact.file_name())?;
        Ok(())
    }

    fn decoding_with(&mut self, decoder: &ExecutableHandle) -> Result<()> {
        tracing::debug!(version = %decoder.version, bitness = %decoder.bitness, "decode");
        Ok(())
    }

    fn output_checked(&mut self, output: &Path, matched: bool) -> Result<()> {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if matched {
            writeln!(self.out, "OK  : {name}")?;
        } else {
            writeln!(self.out, "ERR : {name}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub schema_version: &'static str,
    pub ok: bool,
    pub config: &'a HarnessConfig,
    pub versions: &'a [VersionId],
    pub executables: &'a [Provisioned],
    pub artifacts: &'a [Artifact],
    pub duplicates: Vec<DuplicateReport>,
    pub representatives: Vec<String>,
    pub decoded: usize,
    pub mismatches: &'a [crate::verify::Mismatch],
}

#[derive(Debug, Serialize)]
pub struct DuplicateReport {
    pub kept: String,
    pub discarded: String,
}

impl<'a> RunReport<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        versions: &'a [VersionId],
        executables: &'a [Provisioned],
        artifacts: &'a [Artifact],
        dedup: &Deduplicated,
        verification: &'a Verification,
    ) -> Self {
        Self {
            schema_version: INTEROP_REPORT_SCHEMA_VERSION,
            ok: verification.ok(),
            config,
            versions,
            executables,
            artifacts,
            duplicates: dedup
                .duplicates
                .iter()
                .map(|d| DuplicateReport {
                    kept: dedup.kept_for(d).file_name(),
                    discarded: d.discarded.file_name(),
                })
                .collect(),
            representatives: dedup.representatives.iter().map(Artifact::file_name).collect(),
            decoded: verification.decoded,
            mismatches: &verification.mismatches,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

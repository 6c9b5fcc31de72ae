use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::codec::CodecRunner;
use crate::layout::ScratchLayout;
use crate::matrix::Artifact;
use crate::provision::{ExecutableHandle, ExecutableSet};
use crate::version::{Bitness, Level, VersionId};

/// A decoded output whose bytes differ from the reference input.
///
/// The output file is left on disk for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
    pub artifact: PathBuf,
    pub producer_version: VersionId,
    pub producer_bitness: Bitness,
    pub producer_level: Level,
    pub decoder_version: VersionId,
    pub decoder_bitness: Bitness,
    pub output: PathBuf,
    pub expected_size: u64,
    pub actual_size: u64,
    /// The decoder exited 0 but left no output file.
    pub output_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Verification {
    /// Number of (artifact, version, bitness) decodes performed.
    pub decoded: usize,
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    pub fn ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Progress callbacks; every method defaults to doing nothing.
pub trait VerifyObserver {
    fn artifact_started(&mut self, _artifact: &Artifact) -> Result<()> {
        Ok(())
    }

    fn decoding_with(&mut self, _decoder: &ExecutableHandle) -> Result<()> {
        Ok(())
    }

    fn output_checked(&mut self, _output: &Path, _matched: bool) -> Result<()> {
        Ok(())
    }

    fn artifact_finished(&mut self, _artifact: &Artifact) -> Result<()> {
        Ok(())
    }
}

impl VerifyObserver for () {}

/// What the cross product is run against: the provisioned executables and
/// where their outputs go.
pub struct Verifier<'a> {
    codec: &'a CodecRunner,
    layout: &'a ScratchLayout,
    executables: &'a ExecutableSet,
    bitnesses: &'a [Bitness],
}

impl<'a> Verifier<'a> {
    pub fn new(
        codec: &'a CodecRunner,
        layout: &'a ScratchLayout,
        executables: &'a ExecutableSet,
        bitnesses: &'a [Bitness],
    ) -> Self {
        Self {
            codec,
            layout,
            executables,
            bitnesses,
        }
    }

    /// Decodes every representative with every (version, bitness) executable
    /// and compares the result with `reference`.
    ///
    /// Runs the whole cross product; a mismatch is recorded and the loop goes
    /// on. A decoder that exits 0 without writing anything is a mismatch too.
    /// A decoder exiting non-zero aborts with an error instead.
    pub fn run(
        &self,
        representatives: &[Artifact],
        versions: &[VersionId],
        reference: &[u8],
        observer: &mut dyn VerifyObserver,
    ) -> Result<Verification> {
        let mut out = Verification::default();
        for artifact in representatives {
            observer.artifact_started(artifact)?;
            for version in versions {
                for &bitness in self.bitnesses {
                    let exe = self.executables.get(version, bitness).ok_or_else(|| {
                        anyhow!("no executable provisioned for {version} {bitness}")
                    })?;
                    observer.decoding_with(exe)?;

                    let output = self.layout.decoded_path(&artifact.path, version, bitness);
                    self.codec.decompress(exe, &artifact.path, &output)?;
                    out.decoded += 1;

                    let decoded = read_decoded(&output)?;
                    let matched = decoded.as_deref() == Some(reference);
                    observer.output_checked(&output, matched)?;
                    if matched {
                        std::fs::remove_file(&output)
                            .with_context(|| format!("remove {}", output.display()))?;
                        continue;
                    }

                    tracing::warn!(
                        artifact = %artifact.file_name(),
                        decoder = %version,
                        bitness = %bitness,
                        output_missing = decoded.is_none(),
                        "decoded output differs from reference"
                    );
                    out.mismatches.push(Mismatch {
                        artifact: artifact.path.clone(),
                        producer_version: artifact.version.clone(),
                        producer_bitness: artifact.bitness,
                        producer_level: artifact.level,
                        decoder_version: version.clone(),
                        decoder_bitness: bitness,
                        output,
                        expected_size: reference.len() as u64,
                        actual_size: decoded.as_ref().map_or(0, |d| d.len() as u64),
                        output_missing: decoded.is_none(),
                    });
                }
            }
            observer.artifact_finished(artifact)?;
        }
        Ok(out)
    }
}

/// Reads a decoder's output; `None` when the decoder wrote no file.
fn read_decoded(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

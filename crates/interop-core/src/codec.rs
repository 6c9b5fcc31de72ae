use std::path::Path;

use anyhow::{Context, Result};

use crate::config::CodecConvention;
use crate::exec::Invocation;
use crate::provision::ExecutableHandle;
use crate::version::Level;

/// Invokes executables under test as `<exe> <flags> <input> <output>`.
///
/// Any non-zero exit means the executable itself is broken and is returned as
/// an error, never as a mismatch.
#[derive(Debug, Clone)]
pub struct CodecRunner {
    convention: CodecConvention,
}

impl CodecRunner {
    pub fn new(convention: CodecConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> &CodecConvention {
        &self.convention
    }

    pub fn compress(
        &self,
        exe: &ExecutableHandle,
        level: Level,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        self.invoke(exe, self.convention.level_flags(level), input, output)
            .with_context(|| format!("compress ({level}) with {} {}", exe.version, exe.bitness))
    }

    pub fn decompress(&self, exe: &ExecutableHandle, input: &Path, output: &Path) -> Result<()> {
        self.invoke(exe, &self.convention.decompress_flags, input, output)
            .with_context(|| {
                format!(
                    "decompress {} with {} {}",
                    input.display(),
                    exe.version,
                    exe.bitness
                )
            })
    }

    fn invoke(&self, exe: &ExecutableHandle, flags: &str, input: &Path, output: &Path) -> Result<()> {
        Invocation::new(&exe.path)
            .arg(flags)
            .arg(input)
            .arg(output)
            .run_checked()?;
        Ok(())
    }
}

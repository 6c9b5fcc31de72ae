use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::exec::Invocation;

/// Pseudo-target run before every real target so no object survives from a
/// previous version's build.
pub const CLEAN_TARGET: &str = "clean";

/// Produces executables from a source tree.
pub trait BuildSystem {
    /// Builds `targets` in order inside `dir`. Any non-zero exit is an error.
    fn build(&self, targets: &[&str], dir: &Path, env: &BTreeMap<String, String>) -> Result<()>;
}

/// `make` driven build.
#[derive(Debug, Clone)]
pub struct MakeCli {
    program: String,
}

impl MakeCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl BuildSystem for MakeCli {
    fn build(&self, targets: &[&str], dir: &Path, env: &BTreeMap<String, String>) -> Result<()> {
        let out = Invocation::new(&self.program)
            .args(targets)
            .current_dir(dir)
            .envs(env)
            .run_checked()
            .with_context(|| format!("build {} in {}", targets.join(" "), dir.display()))?;
        tracing::debug!(
            stdout = %String::from_utf8_lossy(&out.stdout),
            "build output"
        );
        Ok(())
    }
}

/// Environment overrides injected into every build.
///
/// `CFLAGS` gains `-O1`. Older trees only read `MOREFLAGS`, so it is extended
/// with the resulting `CFLAGS` plus `CPPFLAGS` and `LDFLAGS`. Existing values
/// are always kept.
pub fn build_env_overrides(lookup: impl Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
    let with_space = |v: Option<String>| v.map(|v| format!(" {v}")).unwrap_or_default();

    let cflags = format!("{} -O1", with_space(lookup("CFLAGS")));
    let moreflags = format!(
        "{}{}{}{}",
        with_space(lookup("MOREFLAGS")),
        with_space(Some(cflags.clone())),
        with_space(lookup("CPPFLAGS")),
        with_space(lookup("LDFLAGS")),
    );

    let mut env = BTreeMap::new();
    env.insert("CFLAGS".to_string(), cflags);
    env.insert("MOREFLAGS".to_string(), moreflags);
    env
}

/// [`build_env_overrides`] against the process environment.
pub fn build_env_from_process() -> BTreeMap<String, String> {
    build_env_overrides(|key| std::env::var(key).ok())
}

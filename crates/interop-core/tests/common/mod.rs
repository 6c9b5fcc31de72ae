#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use interop_core::build::{BuildSystem, CLEAN_TARGET};
use interop_core::catalog::{LEGACY_TAG_PATTERN, SEMVER_TAG_PATTERN};
use interop_core::vcs::VersionControl;
use interop_core::{HarnessConfig, InfraError};

pub const HEAD: &str = "v999";
const VERSION_MARKER: &str = "VERSION";

/// Behaviour of one fake codec executable.
///
/// Compressed output is a 4-byte header (`<header><level digit>\n`) followed
/// by the input, so two versions sharing a header produce identical bytes.
#[derive(Debug, Clone)]
pub struct CodecScript {
    pub header: &'static str,
    pub decode_trailer: Option<&'static str>,
    pub decode_exit: Option<i32>,
    pub decode_writes_nothing: bool,
}

impl CodecScript {
    pub fn plain(header: &'static str) -> Self {
        assert_eq!(header.len(), 2, "header must be two bytes");
        Self {
            header,
            decode_trailer: None,
            decode_exit: None,
            decode_writes_nothing: false,
        }
    }

    pub fn with_trailer(mut self, trailer: &'static str) -> Self {
        self.decode_trailer = Some(trailer);
        self
    }

    pub fn crashing_decoder(mut self, code: i32) -> Self {
        self.decode_exit = Some(code);
        self
    }

    /// Decoding exits 0 and leaves no output file.
    pub fn silent_decoder(mut self) -> Self {
        self.decode_writes_nothing = true;
        self
    }

    pub fn render(&self) -> String {
        let mut decode = if self.decode_writes_nothing {
            String::from("exit 0")
        } else {
            String::from("tail -c +5 \"$in\" > \"$out\"")
        };
        if let Some(t) = self.decode_trailer {
            decode.push_str(&format!("; printf '%s' '{t}' >> \"$out\""));
        }
        if let Some(code) = self.decode_exit {
            decode.push_str(&format!("; echo 'decoder crashed' >&2; exit {code}"));
        }
        format!(
            "#!/bin/sh\nflags=\"$1\"; in=\"$2\"; out=\"$3\"\ncase \"$flags\" in\n  -d*) {decode} ;;\n  -1*) {{ printf '%s1\\n' '{h}'; cat \"$in\"; }} > \"$out\" ;;\n  -9*) {{ printf '%s9\\n' '{h}'; cat \"$in\"; }} > \"$out\" ;;\n  *) echo \"unknown flags: $flags\" >&2; exit 64 ;;\nesac\n",
            h = self.header
        )
    }
}

pub fn write_executable(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    // The final path only ever holds a complete, executable script.
    let tmp = path.with_extension("writing");
    std::fs::write(&tmp, contents).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
    }
    std::fs::rename(&tmp, path).expect("rename script");
}

#[derive(Debug, Default)]
pub struct FakeVcs {
    pub legacy: Vec<&'static str>,
    pub semver: Vec<&'static str>,
    pub unreachable: bool,
    pub clones: RefCell<Vec<PathBuf>>,
    pub checkouts: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn new(legacy: &[&'static str], semver: &[&'static str]) -> Self {
        Self {
            legacy: legacy.to_vec(),
            semver: semver.to_vec(),
            ..Self::default()
        }
    }
}

impl VersionControl for FakeVcs {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<()> {
        if self.unreachable {
            bail!("could not resolve host");
        }
        std::fs::create_dir_all(dest)?;
        self.clones.borrow_mut().push(dest.to_path_buf());
        Ok(())
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        if self.unreachable {
            bail!("could not resolve host");
        }
        let tags = match pattern {
            LEGACY_TAG_PATTERN => &self.legacy,
            SEMVER_TAG_PATTERN => &self.semver,
            other => bail!("unexpected pattern {other}"),
        };
        Ok(tags.iter().map(|t| t.to_string()).collect())
    }

    fn checkout(&self, tag: &str, target_dir: &Path) -> Result<()> {
        let programs = target_dir.join("programs");
        std::fs::create_dir_all(&programs)?;
        std::fs::write(programs.join(VERSION_MARKER), tag)?;
        self.checkouts.borrow_mut().push(tag.to_string());
        Ok(())
    }
}

/// Build collaborator that "compiles" by writing a codec script whose
/// behaviour is looked up by (version, target).
#[derive(Debug, Default)]
pub struct FakeMake {
    pub scripts: BTreeMap<(String, String), CodecScript>,
    pub defaults: BTreeMap<String, CodecScript>,
    pub failing: Option<&'static str>,
    pub builds: RefCell<Vec<(String, String)>>,
    pub seen_env: RefCell<Vec<BTreeMap<String, String>>>,
}

impl FakeMake {
    /// Every target of `version` behaves like `script`.
    pub fn version(mut self, version: &str, script: CodecScript) -> Self {
        self.defaults.insert(version.to_string(), script);
        self
    }

    /// Overrides one (version, target) pair.
    pub fn target(mut self, version: &str, target: &str, script: CodecScript) -> Self {
        self.scripts
            .insert((version.to_string(), target.to_string()), script);
        self
    }

    pub fn failing(mut self, version: &'static str) -> Self {
        self.failing = Some(version);
        self
    }

    pub fn built(&self) -> Vec<(String, String)> {
        self.builds.borrow().clone()
    }
}

impl BuildSystem for FakeMake {
    fn build(&self, targets: &[&str], dir: &Path, env: &BTreeMap<String, String>) -> Result<()> {
        assert_eq!(targets.len(), 2, "expected clean + target, got {targets:?}");
        assert_eq!(targets[0], CLEAN_TARGET);
        let target = targets[1];
        let version = std::fs::read_to_string(dir.join(VERSION_MARKER))?;
        self.seen_env.borrow_mut().push(env.clone());

        if self.failing == Some(version.as_str()) {
            return Err(InfraError::NonZeroExit {
                command: format!("make {}", targets.join(" ")),
                status: "exit status: 2".to_string(),
                code: Some(2),
                stdout: String::new(),
                stderr: "cc: error: unrecognized option".to_string(),
            }
            .into());
        }

        let script = self
            .scripts
            .get(&(version.clone(), target.to_string()))
            .or_else(|| self.defaults.get(&version))
            .cloned()
            .unwrap_or_else(|| CodecScript::plain("HH"));
        write_executable(&dir.join(target), &script.render());
        self.builds
            .borrow_mut()
            .push((version, target.to_string()));
        Ok(())
    }
}

/// A working tree with a reference input and a head build directory.
pub struct Tree {
    pub dir: tempfile::TempDir,
    pub config: HarnessConfig,
}

impl Tree {
    pub fn new(reference: &[u8]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = HarnessConfig::with_base_dir(dir.path());
        std::fs::write(dir.path().join(&config.reference_src), reference).expect("write reference");
        let programs = dir.path().join(&config.programs_rel);
        std::fs::create_dir_all(&programs).expect("create programs dir");
        std::fs::write(programs.join(VERSION_MARKER), HEAD).expect("write head marker");
        Self { dir, config }
    }

    pub fn scratch(&self) -> PathBuf {
        self.dir.path().join(&self.config.scratch_rel)
    }

    pub fn files_with_ext(&self, ext: &str) -> Vec<String> {
        let mut out: Vec<String> = std::fs::read_dir(self.scratch())
            .expect("read scratch")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }
}

pub const README: &[u8] = b"# LZ4 - Extremely fast compression\n\nLZ4 is lossless compression algorithm.\n";

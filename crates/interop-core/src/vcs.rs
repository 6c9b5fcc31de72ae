use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::exec::Invocation;

/// Version-control operations the harness depends on.
pub trait VersionControl {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Tags matching a glob-style `pattern`, in the order the tool reports them.
    fn list_tags(&self, pattern: &str) -> Result<Vec<String>>;

    /// Writes the tree at `tag` into `target_dir` without touching the clone's
    /// own working tree.
    fn checkout(&self, tag: &str, target_dir: &Path) -> Result<()>;
}

/// `git` command-line client operating on one clone.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(program: impl Into<String>, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repo_dir: repo_dir.into(),
        }
    }

    fn git(&self) -> Invocation {
        Invocation::new(&self.program).current_dir(&self.repo_dir)
    }
}

impl VersionControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        Invocation::new(&self.program)
            .arg("clone")
            .arg(url)
            .arg(dest)
            .run_checked()
            .with_context(|| format!("clone {url}"))?;
        Ok(())
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        let out = self
            .git()
            .args(["tag", "-l", pattern])
            .run_checked()
            .with_context(|| format!("list tags matching {pattern}"))?;
        Ok(String::from_utf8_lossy(&out.stdout)
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    fn checkout(&self, tag: &str, target_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(target_dir)
            .with_context(|| format!("create_dir_all {}", target_dir.display()))?;
        let mut work_tree = std::ffi::OsString::from("--work-tree=");
        work_tree.push(target_dir);
        self.git()
            .arg(work_tree)
            .args(["checkout", tag, "--", "."])
            .run_checked()
            .with_context(|| format!("checkout {tag} into {}", target_dir.display()))?;
        Ok(())
    }
}

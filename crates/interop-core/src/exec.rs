use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Result;

use crate::error::InfraError;

/// Result of one external invocation: exit status plus captured streams.
#[derive(Debug)]
pub struct CommandOutput {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Turns a non-zero exit into a fatal [`InfraError::NonZeroExit`].
    ///
    /// Success is decided by the exit status alone; output is never parsed.
    pub fn checked(self) -> Result<Self, InfraError> {
        if self.status.success() {
            return Ok(self);
        }
        Err(InfraError::NonZeroExit {
            status: self.status.to_string(),
            code: self.status.code(),
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            command: self.command,
        })
    }
}

/// A single external invocation, built up before it is run.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<std::path::PathBuf>,
    env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for a in args {
            self = self.arg(a);
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Lossy rendering for logs and error messages only.
    pub fn display(&self) -> String {
        let mut s = self.program.to_string_lossy().into_owned();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        s
    }

    /// Runs to completion, capturing stdout and stderr. Blocks the caller.
    pub fn output(&self) -> Result<CommandOutput, InfraError> {
        let command = self.display();
        tracing::debug!(
            command = %command,
            cwd = ?self.cwd,
            env = ?self.env,
            "exec"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env);

        let out = cmd.output().map_err(|source| InfraError::Spawn {
            command: command.clone(),
            source,
        })?;
        tracing::debug!(command = %command, status = %out.status, "exec done");
        Ok(CommandOutput {
            command,
            status: out.status,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }

    /// Runs and fails on anything but exit status zero.
    pub fn run_checked(&self) -> Result<CommandOutput, InfraError> {
        self.output()?.checked()
    }
}

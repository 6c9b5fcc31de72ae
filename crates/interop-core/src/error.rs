use std::path::PathBuf;

/// Failures of the test apparatus itself.
///
/// These always abort the run. A decoded artifact that differs from the
/// reference input is not an `InfraError`; it is recorded as a mismatch.
#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status})\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("build of {target} in {} exited 0 but produced no executable", .dir.display())]
    MissingOutput { target: String, dir: PathBuf },
}

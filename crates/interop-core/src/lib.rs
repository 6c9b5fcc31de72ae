//! Cross-version interoperability harness for a compression tool.
//!
//! Every released version (plus the working tree) is built for native and
//! 32-bit targets, compresses one reference input at each level, and every
//! distinct artifact is decoded by every executable. A decoded output that is
//! not byte-identical to the input is a compatibility failure; anything that
//! prevents the matrix from running is an infrastructure failure
//! ([`error::InfraError`]) and aborts the run.

pub mod build;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod error;
pub mod exec;
pub mod harness;
pub mod layout;
pub mod matrix;
pub mod provision;
pub mod report;
pub mod util;
pub mod vcs;
pub mod verify;
pub mod version;

pub use config::HarnessConfig;
pub use error::InfraError;
pub use harness::{Harness, RunOutcome};
pub use version::{Bitness, Level, VersionId};

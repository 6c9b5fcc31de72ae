//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable output of the interoperability harness.

pub const INTEROP_REPORT_SCHEMA_VERSION: &str = "interop.versions.report@0.1.0";

/// File name of the JSON run report, relative to the scratch directory.
pub const INTEROP_REPORT_FILE_NAME: &str = "interop-report.json";

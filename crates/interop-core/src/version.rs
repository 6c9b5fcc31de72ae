use std::fmt;

use serde::{Serialize, Serializer};

/// A release under test, or the in-progress working tree.
///
/// Ordering between versions is never semantic: callers keep whatever order the
/// catalog produced.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionId {
    /// The working tree the harness is run from. Always rebuilt.
    Head { label: String },
    /// A tag reported by the version-control collaborator.
    Tag(String),
}

impl VersionId {
    pub fn head(label: impl Into<String>) -> Self {
        VersionId::Head {
            label: label.into(),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        VersionId::Tag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionId::Head { label } => label,
            VersionId::Tag(tag) => tag,
        }
    }

    pub fn is_head(&self) -> bool {
        matches!(self, VersionId::Head { .. })
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bitness {
    Native,
    Bits32,
}

impl Bitness {
    pub const ALL: [Bitness; 2] = [Bitness::Native, Bitness::Bits32];

    /// Word-width tag used in artifact file names.
    pub fn file_tag(self) -> &'static str {
        match self {
            Bitness::Native => "64",
            Bitness::Bits32 => "32",
        }
    }

    /// Build target / executable stem for `tool` at this bitness.
    pub fn target(self, tool: &str) -> String {
        match self {
            Bitness::Native => tool.to_string(),
            Bitness::Bits32 => format!("{tool}32"),
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bitness::Native => f.write_str("native"),
            Bitness::Bits32 => f.write_str("32-bit"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Fast,
    Max,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Fast, Level::Max];

    pub fn file_tag(self) -> &'static str {
        match self {
            Level::Fast => "1",
            Level::Max => "9",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Fast => f.write_str("fast"),
            Level::Max => f.write_str("max"),
        }
    }
}
